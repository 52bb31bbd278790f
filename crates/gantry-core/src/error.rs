//! Shared error types raised while mapping graphs

use thiserror::Error;

use crate::model::TargetReference;

/// Requested target names could not be resolved against the graph.
///
/// Both lists are sorted so the message is reproducible in tests and
/// actionable for users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "The following targets were not found in the graph: {}. The available targets are: {}.",
    .missing.join(", "),
    .available.join(", ")
)]
pub struct MissingTargetsError {
    pub missing: Vec<String>,
    pub available: Vec<String>,
}

impl MissingTargetsError {
    pub fn new(mut missing: Vec<String>, mut available: Vec<String>) -> Self {
        missing.sort();
        available.sort();
        MissingTargetsError { missing, available }
    }
}

/// The target dependency relation contains a cycle. This is a fatal
/// configuration error, not something mappers recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "The dependency graph contains a cycle through target '{}' in project {}",
    .reference.name,
    .reference.project_path.display()
)]
pub struct GraphCycleError {
    pub reference: TargetReference,
}

impl GraphCycleError {
    pub fn new(reference: TargetReference) -> Self {
        GraphCycleError { reference }
    }
}
