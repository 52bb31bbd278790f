//! Read-only queries over a graph

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::GraphCycleError;
use crate::graph::Graph;
use crate::model::{GraphDependency, GraphTarget, Product, ProjectKind, TargetReference};

/// Read-only navigation over a `Graph` without exposing its internal map
/// shapes to callers.
///
/// Traversal never fails: a missing project or target yields an empty
/// result. Invariant checks (e.g. "these names must exist") belong to the
/// callers that need them.
pub struct GraphTraverser<'a> {
    graph: &'a Graph,
}

impl<'a> GraphTraverser<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        GraphTraverser { graph }
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Every target in the graph, materialized with its owning project.
    pub fn all_targets(&self) -> BTreeSet<GraphTarget> {
        self.all_targets_filtered(false)
    }

    /// Targets owned by local projects only; external/package checkouts are
    /// excluded. This is the default scope for cache substitution.
    pub fn all_internal_targets(&self) -> BTreeSet<GraphTarget> {
        self.all_targets_filtered(true)
    }

    fn all_targets_filtered(&self, excluding_external: bool) -> BTreeSet<GraphTarget> {
        self.graph
            .projects
            .iter()
            .filter(|(_, project)| !(excluding_external && project.kind == ProjectKind::External))
            .flat_map(|(path, project)| {
                self.graph
                    .targets
                    .get(path)
                    .into_iter()
                    .flat_map(|targets| targets.values())
                    .map(|target| GraphTarget {
                        path: path.clone(),
                        target: target.clone(),
                        project: project.clone(),
                    })
            })
            .collect()
    }

    /// All targets producing the given product.
    pub fn targets_with_product(&self, product: Product) -> BTreeSet<GraphTarget> {
        self.all_targets()
            .into_iter()
            .filter(|target| target.target.product == product)
            .collect()
    }

    pub fn target(&self, path: &Path, name: &str) -> Option<GraphTarget> {
        self.graph.graph_target(path, name)
    }

    /// All targets defined by the project at `path`.
    pub fn targets_at(&self, path: &Path) -> BTreeSet<GraphTarget> {
        let Some(project) = self.graph.projects.get(path) else {
            return BTreeSet::new();
        };
        self.graph
            .targets
            .get(path)
            .into_iter()
            .flat_map(|targets| targets.values())
            .map(|target| GraphTarget {
                path: path.to_path_buf(),
                target: target.clone(),
                project: project.clone(),
            })
            .collect()
    }

    /// Direct target dependencies of `(path, name)`. Does not recurse.
    pub fn direct_target_dependencies(&self, path: &Path, name: &str) -> BTreeSet<GraphTarget> {
        let node = GraphDependency::target(name, path);
        self.graph
            .dependencies
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|dependency| dependency.as_target())
            .filter_map(|(dep_name, dep_path)| self.graph.graph_target(dep_path, dep_name))
            .collect()
    }

    /// The transitive target dependency closure of `(path, name)`, not
    /// including the target itself. Iterative walk with a visited set, so
    /// diamonds are traversed once and a (disallowed) cycle terminates.
    pub fn all_target_dependencies(&self, path: &Path, name: &str) -> BTreeSet<GraphTarget> {
        let mut closure = BTreeSet::new();
        let mut visited: BTreeSet<TargetReference> = BTreeSet::new();
        let mut queue: VecDeque<GraphTarget> =
            self.direct_target_dependencies(path, name).into_iter().collect();

        while let Some(target) = queue.pop_front() {
            if !visited.insert(target.reference()) {
                continue;
            }
            for dependency in self.direct_target_dependencies(&target.path, &target.target.name) {
                queue.push_back(dependency);
            }
            closure.insert(target);
        }
        closure
    }

    /// Inverse-edge query: test targets whose transitive dependency closure
    /// includes `(path, name)`. Used to keep tests in scope when focusing on
    /// a subset of targets. Sorted for determinism.
    pub fn test_targets_depending_on(&self, path: &Path, name: &str) -> BTreeSet<GraphTarget> {
        let reference = TargetReference::new(path, name);
        self.all_targets()
            .into_iter()
            .filter(|target| target.target.product.is_tests())
            .filter(|target| {
                self.all_target_dependencies(&target.path, &target.target.name)
                    .iter()
                    .any(|dependency| dependency.reference() == reference)
            })
            .collect()
    }

    /// All targets in topological order, dependencies first. A cycle in the
    /// target relation is a fatal configuration error.
    pub fn all_targets_topological_sorted(&self) -> Result<Vec<GraphTarget>, GraphCycleError> {
        let targets = self.all_targets();
        let mut petgraph: DiGraph<TargetReference, ()> = DiGraph::new();
        let mut indices: BTreeMap<TargetReference, NodeIndex> = BTreeMap::new();

        for target in &targets {
            let reference = target.reference();
            let index = petgraph.add_node(reference.clone());
            indices.insert(reference, index);
        }

        // Edges point from dependency to dependent, so the sort yields
        // dependencies before the targets that consume them.
        for (node, dependencies) in &self.graph.dependencies {
            let Some((name, path)) = node.as_target() else {
                continue;
            };
            let Some(&dependent) = indices.get(&TargetReference::new(path, name)) else {
                continue;
            };
            for dependency in dependencies {
                let Some((dep_name, dep_path)) = dependency.as_target() else {
                    continue;
                };
                if let Some(&index) = indices.get(&TargetReference::new(dep_path, dep_name)) {
                    petgraph.add_edge(index, dependent, ());
                }
            }
        }

        let sorted = toposort(&petgraph, None)
            .map_err(|cycle| GraphCycleError::new(petgraph[cycle.node_id()].clone()))?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| {
                let reference = &petgraph[index];
                self.graph.graph_target(&reference.project_path, &reference.name)
            })
            .collect())
    }
}
