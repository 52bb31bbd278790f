//! Graph mutation against fetched cache artifacts

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use gantry_core::{Graph, GraphDependency, GraphTarget, GraphTraverser, TargetReference};

/// Rewires a graph so that dependency edges point at fetched binary
/// artifacts instead of the source targets they replace.
///
/// A target is only ever swapped when its entire transitive target subtree
/// has artifacts; linking a binary against a from-source dependency is not
/// representable. Everything that ends up outside the retained source set is
/// marked prunable for the tree-shaking mapper.
#[derive(Debug, Default)]
pub struct CacheGraphMutator;

impl CacheGraphMutator {
    pub fn new() -> Self {
        CacheGraphMutator
    }

    /// - `precompiled_artifacts` maps targets to fetched artifact paths.
    /// - `sources` holds target names that must stay source regardless of
    ///   cache state; the targets named there (plus the test targets
    ///   depending on them) seed the rebuild.
    pub fn map(
        &self,
        graph: Graph,
        precompiled_artifacts: &BTreeMap<GraphTarget, PathBuf>,
        sources: &BTreeSet<String>,
    ) -> Graph {
        let mut graph = graph;

        let (new_dependencies, source_targets) = {
            let traverser = GraphTraverser::new(&graph);
            let user_source_targets: Vec<GraphTarget> = traverser
                .all_targets()
                .into_iter()
                .filter(|target| sources.contains(&target.target.name))
                .collect();
            let dependent_test_targets: Vec<GraphTarget> = user_source_targets
                .iter()
                .flat_map(|target| {
                    traverser.test_targets_depending_on(&target.path, &target.target.name)
                })
                .collect();

            let mut visit = Visit {
                traverser: &traverser,
                precompiled_artifacts,
                sources,
                new_dependencies: BTreeMap::new(),
                source_targets: BTreeSet::new(),
                visited_artifacts: BTreeMap::new(),
            };
            for target in user_source_targets.iter().chain(dependent_test_targets.iter()) {
                visit.visit(target);
            }
            (visit.new_dependencies, visit.source_targets)
        };

        graph.dependencies = new_dependencies;

        // Whatever did not survive as source gets pruned by tree-shaking.
        for (path, targets) in graph.targets.iter_mut() {
            for (name, target) in targets.iter_mut() {
                if !source_targets.contains(&TargetReference::new(path, name)) {
                    target.prune = true;
                }
            }
        }

        graph
    }
}

struct Visit<'a> {
    traverser: &'a GraphTraverser<'a>,
    precompiled_artifacts: &'a BTreeMap<GraphTarget, PathBuf>,
    sources: &'a BTreeSet<String>,
    new_dependencies: BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
    source_targets: BTreeSet<TargetReference>,
    visited_artifacts: BTreeMap<TargetReference, Option<PathBuf>>,
}

impl Visit<'_> {
    fn visit(&mut self, target: &GraphTarget) {
        self.source_targets.insert(target.reference());
        let node = GraphDependency::target(&target.target.name, &target.path);
        if self.new_dependencies.contains_key(&node) {
            return;
        }
        let dependencies = self.traverser.graph().dependencies_of(&node);
        let mapped = self.map_dependencies(&dependencies);
        self.new_dependencies.insert(node, mapped);
    }

    fn map_dependencies(
        &mut self,
        dependencies: &BTreeSet<GraphDependency>,
    ) -> BTreeSet<GraphDependency> {
        let mut new_dependencies = BTreeSet::new();
        for dependency in dependencies {
            let dependency_target = match dependency.as_target() {
                Some((name, path)) => match self.traverser.target(path, name) {
                    Some(target) => target,
                    // Dangling target edge: nothing to keep or replace.
                    None => continue,
                },
                // Non-target dependencies (SDKs, packages, prebuilt binaries
                // already in the graph) are kept as-is.
                None => {
                    new_dependencies.insert(dependency.clone());
                    continue;
                }
            };

            let replacement = if self.sources.contains(&dependency_target.target.name) {
                None
            } else {
                self.artifact_path(&dependency_target)
            };
            let Some(artifact_path) = replacement else {
                // Stays source: keep the edge and rebuild its own adjacency.
                self.source_targets.insert(dependency_target.reference());
                if !self.new_dependencies.contains_key(dependency) {
                    let transitive = self.traverser.graph().dependencies_of(dependency);
                    let mapped = self.map_dependencies(&transitive);
                    self.new_dependencies.insert(dependency.clone(), mapped);
                }
                new_dependencies.insert(dependency.clone());
                continue;
            };
            let artifact = artifact_dependency(&artifact_path);

            // Dynamic artifacts below the replaced target still need to be
            // linked; static ones are already part of the binary.
            let transitive = self.traverser.graph().dependencies_of(dependency);
            for mapped in self.map_dependencies(&transitive) {
                match mapped {
                    GraphDependency::Framework { .. } | GraphDependency::Xcframework { .. } => {
                        self.new_dependencies
                            .entry(artifact.clone())
                            .or_default()
                            .insert(mapped);
                    }
                    _ => {}
                }
            }
            new_dependencies.insert(artifact);
        }
        new_dependencies
    }

    /// The fetched artifact path for `target`, provided its whole transitive
    /// target subtree has artifacts too. Memoized.
    fn artifact_path(&mut self, target: &GraphTarget) -> Option<PathBuf> {
        let reference = target.reference();
        if let Some(visited) = self.visited_artifacts.get(&reference) {
            return visited.clone();
        }

        let Some(path) = self.precompiled_artifacts.get(target) else {
            self.visited_artifacts.insert(reference, None);
            return None;
        };
        let path = path.clone();

        let dependencies = self
            .traverser
            .direct_target_dependencies(&target.path, &target.target.name);
        let replaceable = dependencies
            .iter()
            .all(|dependency| self.artifact_path(dependency).is_some());

        let result = replaceable.then_some(path);
        self.visited_artifacts.insert(reference, result.clone());
        result
    }
}

fn artifact_dependency(path: &Path) -> GraphDependency {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("xcframework") => GraphDependency::Xcframework {
            path: path.to_path_buf(),
        },
        Some("a") => GraphDependency::Library {
            path: path.to_path_buf(),
        },
        _ => GraphDependency::Framework {
            path: path.to_path_buf(),
        },
    }
}
