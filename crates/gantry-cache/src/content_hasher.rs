//! Cache-aware graph content hashing

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use gantry_core::{Graph, GraphTarget, Product};
use gantry_hasher::{GraphContentHasher, HashError};

use crate::config::CacheProfile;

/// The artifact kind produced for cached targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutputType {
    Framework,
    Xcframework,
    StaticLibrary,
}

impl fmt::Display for CacheOutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOutputType::Framework => write!(f, "framework"),
            CacheOutputType::Xcframework => write!(f, "xcframework"),
            CacheOutputType::StaticLibrary => write!(f, "static-library"),
        }
    }
}

/// Whether a target's product can be replaced by a prebuilt binary at all.
/// Apps and test bundles always build from source.
pub fn is_cacheable(product: Product) -> bool {
    matches!(
        product,
        Product::Framework
            | Product::StaticFramework
            | Product::StaticLibrary
            | Product::DynamicLibrary
    )
}

/// Hashes the cacheable slice of the graph, folding the caching profile and
/// output artifact type into every digest so differently-built artifacts
/// never share a key.
pub struct CacheGraphContentHasher {
    graph_content_hasher: GraphContentHasher,
}

impl CacheGraphContentHasher {
    pub fn new(graph_content_hasher: GraphContentHasher) -> Self {
        CacheGraphContentHasher { graph_content_hasher }
    }

    pub fn content_hashes(
        &self,
        graph: &Graph,
        profile: &CacheProfile,
        output_type: CacheOutputType,
        excluded_targets: &BTreeSet<String>,
    ) -> Result<BTreeMap<GraphTarget, String>, HashError> {
        let additional_strings = [
            profile.name.clone(),
            profile.configuration.clone(),
            output_type.to_string(),
        ];
        self.graph_content_hasher.content_hashes(
            graph,
            |target| {
                is_cacheable(target.target.product)
                    && !excluded_targets.contains(&target.target.name)
            },
            &additional_strings,
        )
    }
}
