//! The dependency graph aggregate

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{GraphDependency, GraphTarget, Project, Target, Workspace};

/// The full dependency model of a workspace: projects, targets, and the
/// edges between them.
///
/// The graph is a value type. Mappers receive a graph by value and return a
/// new one; no shared mutable graph state crosses concurrency boundaries.
/// Identity is carried by stable keys (project path, target name), not by
/// object references, so mappers can rebuild subsets freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub workspace: Workspace,
    /// All projects, keyed by filesystem path. The path is the project's
    /// identity.
    pub projects: BTreeMap<PathBuf, Project>,
    /// Two-level map: project path → target name → target.
    pub targets: BTreeMap<PathBuf, BTreeMap<String, Target>>,
    /// Adjacency over dependency identifiers. The single source of truth for
    /// dependency edges.
    #[serde(with = "dependency_map")]
    pub dependencies: BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
}

impl Graph {
    pub fn new(name: impl Into<String>, workspace: Workspace) -> Self {
        Graph {
            name: name.into(),
            workspace,
            projects: BTreeMap::new(),
            targets: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Look up a target value by its identity.
    pub fn target(&self, path: &Path, name: &str) -> Option<&Target> {
        self.targets.get(path).and_then(|targets| targets.get(name))
    }

    /// Materialize a target together with its owning project. Returns `None`
    /// when either the project or the target is missing.
    pub fn graph_target(&self, path: &Path, name: &str) -> Option<GraphTarget> {
        let project = self.projects.get(path)?;
        let target = self.target(path, name)?;
        Some(GraphTarget {
            path: path.to_path_buf(),
            target: target.clone(),
            project: project.clone(),
        })
    }

    /// Total number of targets across all projects.
    pub fn target_count(&self) -> usize {
        self.targets.values().map(|targets| targets.len()).sum()
    }

    /// Direct dependencies of a dependency node; empty when the node has no
    /// outgoing edges.
    pub fn dependencies_of(&self, dependency: &GraphDependency) -> BTreeSet<GraphDependency> {
        self.dependencies.get(dependency).cloned().unwrap_or_default()
    }
}

/// JSON object keys must be strings, so the adjacency map serializes as a
/// list of `(node, dependencies)` entries.
mod dependency_map {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(
        map: &BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(&GraphDependency, &BTreeSet<GraphDependency>)> = map.iter().collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<GraphDependency, BTreeSet<GraphDependency>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(GraphDependency, BTreeSet<GraphDependency>)> =
            Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
