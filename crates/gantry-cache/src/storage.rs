//! Cache storage backends
//!
//! Artifacts are opaque blobs named by `(target name, content hash)`.
//! Storage reads are idempotent; concurrent lookups are safe.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use thiserror::Error;

/// Capability to look up, fetch, and publish cached artifacts.
#[async_trait::async_trait]
pub trait CacheStoring: Send + Sync {
    /// Whether an artifact exists for `(name, hash)`.
    async fn exists(&self, name: &str, hash: &str) -> Result<bool>;

    /// Fetch the artifact for `(name, hash)` and return a local path to it.
    async fn fetch(&self, name: &str, hash: &str) -> Result<PathBuf>;

    /// Publish artifact files under `(name, hash)`.
    async fn store(&self, name: &str, hash: &str, paths: &[PathBuf]) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum LocalCacheStorageError {
    #[error("No cached artifact for target '{name}' with hash {hash}")]
    ArtifactNotFound { name: String, hash: String },
}

/// Filesystem storage tier. Artifacts live in one directory per content
/// hash: `<root>/<hash>/<artifact>`.
pub struct LocalCacheStorage {
    root: PathBuf,
}

impl LocalCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalCacheStorage { root: root.into() }
    }

    fn artifact_directory(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    fn artifact_path(&self, name: &str, hash: &str) -> Option<PathBuf> {
        let directory = self.artifact_directory(hash);
        let entries = std::fs::read_dir(&directory).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy() == name)
                    .unwrap_or(false)
            })
    }
}

#[async_trait::async_trait]
impl CacheStoring for LocalCacheStorage {
    async fn exists(&self, name: &str, hash: &str) -> Result<bool> {
        Ok(self.artifact_path(name, hash).is_some())
    }

    async fn fetch(&self, name: &str, hash: &str) -> Result<PathBuf> {
        self.artifact_path(name, hash).ok_or_else(|| {
            LocalCacheStorageError::ArtifactNotFound {
                name: name.to_string(),
                hash: hash.to_string(),
            }
            .into()
        })
    }

    async fn store(&self, name: &str, hash: &str, paths: &[PathBuf]) -> Result<()> {
        let directory = self.artifact_directory(hash);
        std::fs::create_dir_all(&directory)?;
        for path in paths {
            let Some(file_name) = path.file_name() else {
                bail!("Artifact path {} has no file name", path.display());
            };
            copy_recursively(path, &directory.join(file_name))?;
        }
        tracing::debug!(
            "Stored artifact for '{}' with hash {} at {}",
            name,
            hash,
            directory.display()
        );
        Ok(())
    }
}

fn copy_recursively(from: &Path, to: &Path) -> std::io::Result<()> {
    if from.is_dir() {
        std::fs::create_dir_all(to)?;
        for entry in std::fs::read_dir(from)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        std::fs::copy(from, to)?;
    }
    Ok(())
}

/// Composes storage tiers, first hit wins. The composition order (e.g.
/// local before remote) is a configuration concern.
pub struct TieredCacheStorage {
    tiers: Vec<Arc<dyn CacheStoring>>,
}

impl TieredCacheStorage {
    pub fn new(tiers: Vec<Arc<dyn CacheStoring>>) -> Self {
        TieredCacheStorage { tiers }
    }
}

#[async_trait::async_trait]
impl CacheStoring for TieredCacheStorage {
    async fn exists(&self, name: &str, hash: &str) -> Result<bool> {
        for tier in &self.tiers {
            match tier.exists(name, hash).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!("Cache tier failed existence check for '{}': {}", name, error);
                }
            }
        }
        Ok(false)
    }

    async fn fetch(&self, name: &str, hash: &str) -> Result<PathBuf> {
        for tier in &self.tiers {
            match tier.exists(name, hash).await {
                Ok(true) => return tier.fetch(name, hash).await,
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!("Cache tier failed existence check for '{}': {}", name, error);
                }
            }
        }
        bail!("No cache tier holds an artifact for '{}' with hash {}", name, hash)
    }

    async fn store(&self, name: &str, hash: &str, paths: &[PathBuf]) -> Result<()> {
        for tier in &self.tiers {
            tier.store(name, hash, paths).await?;
        }
        Ok(())
    }
}
