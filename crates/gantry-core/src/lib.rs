//! Gantry Core — dependency graph model, traversal, and the mapper pipeline

pub mod error;
pub mod graph;
pub mod mapper;
pub mod model;
pub mod traverser;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;


pub use error::{GraphCycleError, MissingTargetsError};
pub use graph::Graph;
pub use mapper::{
    DirectoryDescriptor, FileDescriptor, GraphMapping, SequentialGraphMapper, SideEffectDescriptor,
    SideEffectState,
};
pub use model::{
    BuildAction, GraphDependency, GraphTarget, Platform, Product, Project, ProjectKind, Scheme,
    Target, TargetReference, TestAction, TestableTarget, Workspace,
};
pub use traverser::GraphTraverser;
