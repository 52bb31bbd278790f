//! Default mapper pipeline assembly

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use gantry_cache::{
    CacheCategory, CacheConfig, CacheDirectoriesProvider, CacheOutputType, CacheStoring,
    TargetsToCacheBinariesGraphMapper, TestsCacheGraphMapper,
};
use gantry_core::{GraphMapping, SequentialGraphMapper};

use crate::focus::FocusTargetsGraphMapper;
use crate::tree_shake::TreeShakePrunedTargetsGraphMapper;

/// Options for assembling the default pipeline.
pub struct PipelineOptions {
    pub sources: BTreeSet<String>,
    pub excluded_sources: BTreeSet<String>,
    pub output_type: CacheOutputType,
    /// Skips the test-result cache mapper, e.g. when generating a project
    /// that will not run tests.
    pub skip_tests_cache: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            sources: BTreeSet::new(),
            excluded_sources: BTreeSet::new(),
            output_type: CacheOutputType::Xcframework,
            skip_tests_cache: false,
        }
    }
}

/// The default mapping order. Ordering is semantic: cache substitution sets
/// prune flags that tree-shaking consumes, and test-result hashes are
/// computed against the graph state at their point in the pipeline.
pub fn default_mapper_pipeline(
    cache: Arc<dyn CacheStoring>,
    config: &CacheConfig,
    workspace_root: &Path,
    options: PipelineOptions,
) -> SequentialGraphMapper {
    let directories = CacheDirectoriesProvider::new(config, workspace_root);
    let mut mappers: Vec<Box<dyn GraphMapping>> = vec![Box::new(
        TargetsToCacheBinariesGraphMapper::new(
            cache,
            config.profile.clone(),
            options.output_type,
            options.sources,
            options.excluded_sources,
        ),
    )];
    if !options.skip_tests_cache {
        mappers.push(Box::new(TestsCacheGraphMapper::new(
            directories.cache_directory(CacheCategory::Tests),
        )));
    }
    mappers.push(Box::new(TreeShakePrunedTargetsGraphMapper::new()));
    SequentialGraphMapper::new(mappers)
}

/// Pipeline for focusing without cache substitution: mark everything outside
/// the focused closure, then shake it off.
pub fn focus_mapper_pipeline(included_targets: BTreeSet<String>) -> SequentialGraphMapper {
    SequentialGraphMapper::new(vec![
        Box::new(FocusTargetsGraphMapper::new(included_targets)),
        Box::new(TreeShakePrunedTargetsGraphMapper::new()),
    ])
}
