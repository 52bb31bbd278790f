//! Hash primitives for content addressing

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use gantry_core::TargetReference;

/// Errors raised while hashing graph content. Any of these aborts the whole
/// hashing pass: a partial hash set would silently corrupt cache correctness
/// for dependents.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Unable to read {path} while hashing: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "The dependency graph contains a cycle through target '{}' in project {}",
        .reference.name,
        .reference.project_path.display()
    )]
    DependencyCycle { reference: TargetReference },
    #[error("Unable to serialize build settings while hashing: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Deterministic SHA-256 hashing of files, bytes, and ordered string parts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        ContentHasher
    }

    /// Streaming hash of a file's contents as a hex string.
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let file = File::open(path).map_err(|source| HashError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();

        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|source| HashError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    pub fn hash_bytes(&self, data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Digest over an ordered list of parts. Each part is length-delimited so
    /// `["ab", "c"]` and `["a", "bc"]` hash differently.
    pub fn hash_parts(&self, parts: &[String]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.len().to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
