//! Cache configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Named caching profile. The profile participates in cache keys so
/// artifacts built under different configurations never collide.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheProfile {
    pub name: String,
    pub configuration: String,
}

impl Default for CacheProfile {
    fn default() -> Self {
        CacheProfile {
            name: "Development".to_string(),
            configuration: "Debug".to_string(),
        }
    }
}

/// Cache settings, loadable from a `gantry.toml` at the workspace root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Overrides the cache root. Defaults to `.gantry/cache` under the
    /// workspace root.
    pub directory: Option<PathBuf>,
    pub profile: CacheProfile,
}

impl CacheConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Unable to parse config at {}", path.display()))
    }
}
