//! Test-result cache mapper
//!
//! Removes testable targets whose transitive content hash matches a previous
//! successful run. The mapper only reads prior hash markers; it stages the
//! writes as side effects so a failed run never poisons the cache.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Result;

use gantry_core::{
    Graph, GraphMapping, GraphTarget, GraphTraverser, Product, Scheme, SideEffectDescriptor,
    TargetReference,
};
use gantry_hasher::{ContentHasher, GraphContentHasher};

/// Tree-shakes testable targets whose hashes have not changed since the
/// last successful run, as recorded in the tests cache directory.
pub struct TestsCacheGraphMapper {
    tests_cache_directory: PathBuf,
    graph_content_hasher: GraphContentHasher,
}

impl TestsCacheGraphMapper {
    /// `tests_cache_directory` holds one marker file per known-good hash.
    /// Markers staged by this mapper must only be committed after the test
    /// run succeeds.
    pub fn new(tests_cache_directory: impl Into<PathBuf>) -> Self {
        TestsCacheGraphMapper {
            tests_cache_directory: tests_cache_directory.into(),
            graph_content_hasher: GraphContentHasher::new(ContentHasher::new()),
        }
    }

    /// Unit-test targets and their transitive dependency closures. UI tests
    /// depend on the device they run on, so they are never hashed.
    fn hashable_targets(&self, traverser: &GraphTraverser<'_>) -> BTreeSet<GraphTarget> {
        let mut hashable = BTreeSet::new();
        for test_target in traverser.targets_with_product(Product::UnitTests) {
            hashable.extend(
                traverser.all_target_dependencies(&test_target.path, &test_target.target.name),
            );
            hashable.insert(test_target);
        }
        hashable
    }

    fn map_scheme(
        &self,
        scheme: &Scheme,
        traverser: &GraphTraverser<'_>,
        hashes: &BTreeMap<GraphTarget, String>,
        visited: &mut BTreeMap<TargetReference, bool>,
        cached: &mut BTreeSet<GraphTarget>,
    ) -> Scheme {
        let mut scheme = scheme.clone();
        let Some(test_action) = scheme.test_action.as_mut() else {
            return scheme;
        };

        let cached_references: BTreeSet<TargetReference> = test_action
            .targets
            .iter()
            .filter_map(|testable| {
                traverser.target(&testable.target.project_path, &testable.target.name)
            })
            .filter(|target| self.is_cached(target, traverser, hashes, visited))
            .map(|target| {
                let reference = target.reference();
                cached.insert(target);
                reference
            })
            .collect();

        test_action
            .targets
            .retain(|testable| !cached_references.contains(&testable.target));
        // No need to build what will not be tested.
        if let Some(build_action) = scheme.build_action.as_mut() {
            build_action
                .targets
                .retain(|reference| !cached_references.contains(reference));
        }
        scheme
    }

    /// A target is cached iff its hash is known, the marker file for that
    /// hash exists, and every direct dependency is itself cached. Memoized
    /// so diamond-shaped graphs stay linear.
    fn is_cached(
        &self,
        target: &GraphTarget,
        traverser: &GraphTraverser<'_>,
        hashes: &BTreeMap<GraphTarget, String>,
        visited: &mut BTreeMap<TargetReference, bool>,
    ) -> bool {
        let reference = target.reference();
        if let Some(&cached) = visited.get(&reference) {
            return cached;
        }

        let dependencies_cached = traverser
            .direct_target_dependencies(&target.path, &target.target.name)
            .iter()
            .all(|dependency| self.is_cached(dependency, traverser, hashes, visited));

        let Some(hash) = hashes.get(target) else {
            visited.insert(reference, false);
            return false;
        };

        let cached = dependencies_cached && self.tests_cache_directory.join(hash).exists();
        visited.insert(reference, cached);
        cached
    }
}

#[async_trait::async_trait]
impl GraphMapping for TestsCacheGraphMapper {
    async fn map(&self, graph: Graph) -> Result<(Graph, Vec<SideEffectDescriptor>)> {
        tracing::debug!(
            "Transforming graph {}: filtering tests cached by previous runs",
            graph.name
        );

        let mut graph = graph;
        let (workspace_schemes, project_schemes, cached, side_effects) = {
            let traverser = GraphTraverser::new(&graph);
            let hashable = self.hashable_targets(&traverser);
            let hashes = self
                .graph_content_hasher
                .content_hashes(&graph, |target| hashable.contains(target), &[])?;

            let mut visited: BTreeMap<TargetReference, bool> = BTreeMap::new();
            let mut cached: BTreeSet<GraphTarget> = BTreeSet::new();

            let workspace_schemes: Vec<Scheme> = graph
                .workspace
                .schemes
                .iter()
                .map(|scheme| {
                    self.map_scheme(scheme, &traverser, &hashes, &mut visited, &mut cached)
                })
                .collect();

            let project_schemes: BTreeMap<PathBuf, Vec<Scheme>> = graph
                .projects
                .iter()
                .map(|(path, project)| {
                    let schemes = project
                        .schemes
                        .iter()
                        .map(|scheme| {
                            self.map_scheme(scheme, &traverser, &hashes, &mut visited, &mut cached)
                        })
                        .collect();
                    (path.clone(), schemes)
                })
                .collect();

            // Stage a marker per hash not yet recorded; the executor commits
            // them after a successful run.
            let side_effects: Vec<SideEffectDescriptor> = hashes
                .values()
                .filter(|hash| !self.tests_cache_directory.join(hash).exists())
                .map(|hash| SideEffectDescriptor::file(self.tests_cache_directory.join(hash)))
                .collect();

            (workspace_schemes, project_schemes, cached, side_effects)
        };

        for target in &cached {
            tracing::info!(
                "{} has not changed from last successful run, skipping tests",
                target.target.name
            );
        }

        graph.workspace.schemes = workspace_schemes;
        for (path, schemes) in project_schemes {
            if let Some(project) = graph.projects.get_mut(&path) {
                project.schemes = schemes;
            }
        }

        Ok((graph, side_effects))
    }
}
