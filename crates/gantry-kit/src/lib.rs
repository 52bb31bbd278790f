//! Gantry Kit — graph mappers shaping the generated workspace

pub mod focus;
pub mod pipeline;
pub mod tree_shake;

#[cfg(test)]
mod tests;

pub use focus::FocusTargetsGraphMapper;
pub use pipeline::{PipelineOptions, default_mapper_pipeline, focus_mapper_pipeline};
pub use tree_shake::TreeShakePrunedTargetsGraphMapper;
