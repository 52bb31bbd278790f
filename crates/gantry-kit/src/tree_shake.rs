//! Tree-shaking of pruned targets

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Result;

use gantry_core::{
    Graph, GraphDependency, GraphMapping, Project, Scheme, SideEffectDescriptor, Target,
    TargetReference, Workspace,
};

/// Removes targets marked `prune` and everything that becomes unreachable
/// as a result: projects left without targets, schemes left without
/// actions, and dependency edges into the removed subgraph.
///
/// Applying the mapper twice yields the same graph as applying it once:
/// the second pass finds nothing to prune.
#[derive(Debug, Default)]
pub struct TreeShakePrunedTargetsGraphMapper;

impl TreeShakePrunedTargetsGraphMapper {
    pub fn new() -> Self {
        TreeShakePrunedTargetsGraphMapper
    }

    fn tree_shake_scheme(
        scheme: &Scheme,
        source_targets: &BTreeSet<TargetReference>,
    ) -> Option<Scheme> {
        let mut scheme = scheme.clone();

        if let Some(build_action) = scheme.build_action.as_mut() {
            build_action
                .targets
                .retain(|reference| source_targets.contains(reference));
        }
        if let Some(test_action) = scheme.test_action.as_mut() {
            test_action
                .targets
                .retain(|testable| source_targets.contains(&testable.target));
            test_action
                .code_coverage_targets
                .retain(|reference| source_targets.contains(reference));
        }

        let has_build_targets = scheme
            .build_action
            .as_ref()
            .is_some_and(|action| !action.targets.is_empty());
        let has_test_targets = scheme
            .test_action
            .as_ref()
            .is_some_and(|action| !action.targets.is_empty());

        (has_build_targets || has_test_targets).then_some(scheme)
    }

    fn tree_shake_workspace(
        workspace: Workspace,
        retained_projects: &BTreeSet<PathBuf>,
        source_targets: &BTreeSet<TargetReference>,
    ) -> Workspace {
        let mut workspace = workspace;
        workspace
            .projects
            .retain(|path| retained_projects.contains(path));
        workspace.schemes = workspace
            .schemes
            .iter()
            .filter_map(|scheme| Self::tree_shake_scheme(scheme, source_targets))
            .collect();
        workspace
    }

    fn tree_shake_dependencies(
        dependencies: &BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
        source_targets: &BTreeSet<TargetReference>,
    ) -> BTreeMap<GraphDependency, BTreeSet<GraphDependency>> {
        let is_live = |dependency: &GraphDependency| match dependency.as_target() {
            Some((name, path)) => source_targets.contains(&TargetReference::new(path, name)),
            None => true,
        };

        dependencies
            .iter()
            .filter(|(node, _)| is_live(node))
            .map(|(node, node_dependencies)| {
                let filtered = node_dependencies
                    .iter()
                    .filter(|dependency| is_live(dependency))
                    .cloned()
                    .collect();
                (node.clone(), filtered)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl GraphMapping for TreeShakePrunedTargetsGraphMapper {
    async fn map(&self, graph: Graph) -> Result<(Graph, Vec<SideEffectDescriptor>)> {
        tracing::debug!("Transforming graph {}: tree-shaking nodes", graph.name);

        let source_targets: BTreeSet<TargetReference> = graph
            .targets
            .iter()
            .filter(|(path, _)| graph.projects.contains_key(*path))
            .flat_map(|(path, targets)| {
                targets
                    .values()
                    .filter(|target| !target.prune)
                    .map(move |target| TargetReference::new(path, &target.name))
            })
            .collect();

        // Nothing to prune: hand back the input graph untouched.
        if source_targets.len() == graph.target_count() {
            return Ok((graph, Vec::new()));
        }

        let mut graph = graph;

        let mut tree_shaken_projects: BTreeMap<PathBuf, Project> = BTreeMap::new();
        let mut tree_shaken_targets: BTreeMap<PathBuf, BTreeMap<String, Target>> = BTreeMap::new();
        for (path, project) in &graph.projects {
            let retained: BTreeMap<String, Target> = graph
                .targets
                .get(path)
                .into_iter()
                .flat_map(|targets| targets.values())
                .filter(|target| source_targets.contains(&TargetReference::new(path, &target.name)))
                .map(|target| (target.name.clone(), target.clone()))
                .collect();
            // A project with zero live targets is removed, not kept empty.
            if retained.is_empty() {
                continue;
            }

            let mut project = project.clone();
            project.schemes = project
                .schemes
                .iter()
                .filter_map(|scheme| Self::tree_shake_scheme(scheme, &source_targets))
                .collect();
            tree_shaken_projects.insert(path.clone(), project);
            tree_shaken_targets.insert(path.clone(), retained);
        }

        let retained_projects: BTreeSet<PathBuf> = tree_shaken_projects.keys().cloned().collect();
        graph.workspace =
            Self::tree_shake_workspace(graph.workspace, &retained_projects, &source_targets);
        graph.dependencies = Self::tree_shake_dependencies(&graph.dependencies, &source_targets);
        graph.projects = tree_shaken_projects;
        graph.targets = tree_shaken_targets;

        Ok((graph, Vec::new()))
    }
}
