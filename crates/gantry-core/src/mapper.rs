//! Graph mapping protocol, side-effect descriptors, and the pipeline runner

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Whether the described filesystem entry should exist after the side
/// effects are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideEffectState {
    Present,
    Absent,
}

/// A file write (or removal) to be executed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub contents: Option<Vec<u8>>,
    pub state: SideEffectState,
}

/// A directory creation (or removal) to be executed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDescriptor {
    pub path: PathBuf,
    pub state: SideEffectState,
}

/// A deferred description of a filesystem effect. Mappers never write to
/// disk themselves; they stage descriptors for an external executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum SideEffectDescriptor {
    File(FileDescriptor),
    Directory(DirectoryDescriptor),
}

impl SideEffectDescriptor {
    /// An empty marker file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SideEffectDescriptor::File(FileDescriptor {
            path: path.into(),
            contents: None,
            state: SideEffectState::Present,
        })
    }

    /// A directory that should exist at `path`.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        SideEffectDescriptor::Directory(DirectoryDescriptor {
            path: path.into(),
            state: SideEffectState::Present,
        })
    }
}

/// A graph-to-graph transformation plus the side effects it stages.
///
/// Mappers receive the graph by value and return a new one. The pipeline is
/// strictly ordered: a mapper may depend on state (e.g. prune flags) set by
/// an earlier one.
#[async_trait::async_trait]
pub trait GraphMapping: Send + Sync {
    async fn map(&self, graph: Graph) -> Result<(Graph, Vec<SideEffectDescriptor>)>;
}

/// Folds an ordered list of mappers over a graph, threading the graph
/// through and accumulating side effects.
pub struct SequentialGraphMapper {
    mappers: Vec<Box<dyn GraphMapping>>,
}

impl SequentialGraphMapper {
    pub fn new(mappers: Vec<Box<dyn GraphMapping>>) -> Self {
        SequentialGraphMapper { mappers }
    }
}

#[async_trait::async_trait]
impl GraphMapping for SequentialGraphMapper {
    async fn map(&self, graph: Graph) -> Result<(Graph, Vec<SideEffectDescriptor>)> {
        tracing::debug!("Mapping graph {} through {} mappers", graph.name, self.mappers.len());
        let mut graph = graph;
        let mut side_effects = Vec::new();
        for mapper in &self.mappers {
            let (mapped, effects) = mapper.map(graph).await?;
            graph = mapped;
            side_effects.extend(effects);
        }
        Ok((graph, side_effects))
    }
}
