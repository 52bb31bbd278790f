//! Cache directory resolution

use std::path::{Path, PathBuf};

use crate::config::CacheConfig;

/// Cache directory: .gantry/cache/
pub const CACHE_DIR: &str = ".gantry/cache";

/// Named cache categories, each with its own directory under the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    /// Precompiled binary artifacts, keyed by content hash.
    Binaries,
    /// Marker files recording successful test runs, named by content hash.
    Tests,
}

impl CacheCategory {
    pub fn directory_name(&self) -> &'static str {
        match self {
            CacheCategory::Binaries => "binaries",
            CacheCategory::Tests => "tests",
        }
    }
}

/// Resolves named cache categories to absolute directories, honoring the
/// configured root override.
#[derive(Debug, Clone)]
pub struct CacheDirectoriesProvider {
    root: PathBuf,
}

impl CacheDirectoriesProvider {
    pub fn new(config: &CacheConfig, workspace_root: &Path) -> Self {
        let root = config
            .directory
            .clone()
            .unwrap_or_else(|| workspace_root.join(CACHE_DIR));
        CacheDirectoriesProvider { root }
    }

    pub fn cache_directory(&self, category: CacheCategory) -> PathBuf {
        self.root.join(category.directory_name())
    }
}
