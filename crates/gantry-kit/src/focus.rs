//! Focus filtering

use std::collections::BTreeSet;

use anyhow::Result;

use gantry_core::{
    Graph, GraphMapping, GraphTarget, GraphTraverser, MissingTargetsError, SideEffectDescriptor,
    TargetReference,
};

/// Narrows the graph to a set of focused targets: everything outside the
/// focused targets' dependency closures (and the test targets exercising
/// them) is marked for pruning.
///
/// With no names given, every internal target is focused, which keeps the
/// whole local graph and its external dependencies.
pub struct FocusTargetsGraphMapper {
    included_targets: BTreeSet<String>,
}

impl FocusTargetsGraphMapper {
    pub fn new(included_targets: BTreeSet<String>) -> Self {
        FocusTargetsGraphMapper { included_targets }
    }
}

#[async_trait::async_trait]
impl GraphMapping for FocusTargetsGraphMapper {
    async fn map(&self, graph: Graph) -> Result<(Graph, Vec<SideEffectDescriptor>)> {
        tracing::debug!(
            "Transforming graph {}: focusing on {} targets",
            graph.name,
            if self.included_targets.is_empty() {
                "all".to_string()
            } else {
                self.included_targets.len().to_string()
            }
        );

        let mut graph = graph;
        let kept: BTreeSet<TargetReference> = {
            let traverser = GraphTraverser::new(&graph);
            let available: BTreeSet<String> = traverser
                .all_targets()
                .into_iter()
                .map(|target| target.target.name)
                .collect();
            let missing: Vec<String> = self
                .included_targets
                .iter()
                .filter(|name| !available.contains(*name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(
                    MissingTargetsError::new(missing, available.into_iter().collect()).into(),
                );
            }

            // The walk below assumes a DAG; a cycle is a configuration
            // error surfaced here before any pruning happens.
            traverser.all_targets_topological_sorted()?;

            let roots: BTreeSet<GraphTarget> = if self.included_targets.is_empty() {
                traverser.all_internal_targets()
            } else {
                traverser
                    .all_targets()
                    .into_iter()
                    .filter(|target| self.included_targets.contains(&target.target.name))
                    .collect()
            };

            let mut kept: BTreeSet<TargetReference> = BTreeSet::new();
            for root in &roots {
                kept.insert(root.reference());
                for dependency in
                    traverser.all_target_dependencies(&root.path, &root.target.name)
                {
                    kept.insert(dependency.reference());
                }
                for test_target in
                    traverser.test_targets_depending_on(&root.path, &root.target.name)
                {
                    for dependency in traverser
                        .all_target_dependencies(&test_target.path, &test_target.target.name)
                    {
                        kept.insert(dependency.reference());
                    }
                    kept.insert(test_target.reference());
                }
            }
            kept
        };

        for (path, targets) in graph.targets.iter_mut() {
            for (name, target) in targets.iter_mut() {
                if !kept.contains(&TargetReference::new(path, name)) {
                    target.prune = true;
                }
            }
        }

        Ok((graph, Vec::new()))
    }
}
