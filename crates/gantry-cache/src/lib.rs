//! Gantry Cache — binary and test-result caching over the dependency graph

pub mod binaries;
pub mod config;
pub mod content_hasher;
pub mod directories;
pub mod mutator;
pub mod storage;
pub mod tests_cache;


pub use binaries::TargetsToCacheBinariesGraphMapper;
pub use config::{CacheConfig, CacheProfile};
pub use content_hasher::{CacheGraphContentHasher, CacheOutputType, is_cacheable};
pub use directories::{CACHE_DIR, CacheCategory, CacheDirectoriesProvider};
pub use mutator::CacheGraphMutator;
pub use storage::{CacheStoring, LocalCacheStorage, LocalCacheStorageError, TieredCacheStorage};
pub use tests_cache::TestsCacheGraphMapper;
