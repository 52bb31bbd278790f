//! Cache binary substitution mapper

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinSet;

use gantry_core::{
    Graph, GraphMapping, GraphTarget, GraphTraverser, MissingTargetsError, SideEffectDescriptor,
};
use gantry_hasher::{ContentHasher, GraphContentHasher};

use crate::config::CacheProfile;
use crate::content_hasher::{CacheGraphContentHasher, CacheOutputType};
use crate::mutator::CacheGraphMutator;
use crate::storage::CacheStoring;

/// Outcome of a single cache lookup. A miss and a backend error both leave
/// the target building from source; the distinction only feeds logging so a
/// degraded backend is observable.
enum LookupOutcome {
    Hit(PathBuf),
    Miss,
    Error(anyhow::Error),
}

/// Decides, per target, whether to keep it as source or link a precompiled
/// artifact fetched from the cache.
///
/// `sources` focuses the graph: the named targets (and the test targets
/// depending on them) always build from source; with no names given, every
/// internal target stays source and only the external subgraph is
/// substituted. `excluded_sources` are never hashed or queried at all.
pub struct TargetsToCacheBinariesGraphMapper {
    cache: Arc<dyn CacheStoring>,
    content_hasher: CacheGraphContentHasher,
    mutator: CacheGraphMutator,
    profile: CacheProfile,
    output_type: CacheOutputType,
    sources: BTreeSet<String>,
    excluded_sources: BTreeSet<String>,
}

impl TargetsToCacheBinariesGraphMapper {
    pub fn new(
        cache: Arc<dyn CacheStoring>,
        profile: CacheProfile,
        output_type: CacheOutputType,
        sources: BTreeSet<String>,
        excluded_sources: BTreeSet<String>,
    ) -> Self {
        TargetsToCacheBinariesGraphMapper {
            cache,
            content_hasher: CacheGraphContentHasher::new(GraphContentHasher::new(
                ContentHasher::new(),
            )),
            mutator: CacheGraphMutator::new(),
            profile,
            output_type,
            sources,
            excluded_sources,
        }
    }

    /// One concurrent lookup per hashable target; results reduce into a map
    /// afterwards, single-threaded. Each key is written by exactly one task,
    /// so the reduction is commutative and needs no locks.
    async fn fetch_artifacts(
        &self,
        hashes: BTreeMap<GraphTarget, String>,
    ) -> BTreeMap<GraphTarget, PathBuf> {
        let mut lookups = JoinSet::new();
        for (target, hash) in hashes {
            let cache = Arc::clone(&self.cache);
            lookups.spawn(async move {
                let name = target.target.name.clone();
                match lookup(cache.as_ref(), &name, &hash).await {
                    LookupOutcome::Hit(path) => Some((target, path)),
                    LookupOutcome::Miss => None,
                    LookupOutcome::Error(error) => {
                        tracing::warn!(
                            "Cache storage failed for target '{}' with hash {}; building from source: {}",
                            name,
                            hash,
                            error
                        );
                        None
                    }
                }
            });
        }

        let mut artifacts = BTreeMap::new();
        while let Some(joined) = lookups.join_next().await {
            if let Ok(Some((target, path))) = joined {
                artifacts.insert(target, path);
            }
        }
        artifacts
    }
}

async fn lookup(cache: &dyn CacheStoring, name: &str, hash: &str) -> LookupOutcome {
    match cache.exists(name, hash).await {
        Ok(false) => LookupOutcome::Miss,
        Ok(true) => match cache.fetch(name, hash).await {
            Ok(path) => LookupOutcome::Hit(path),
            Err(error) => LookupOutcome::Error(error),
        },
        Err(error) => LookupOutcome::Error(error),
    }
}

#[async_trait::async_trait]
impl GraphMapping for TargetsToCacheBinariesGraphMapper {
    async fn map(&self, graph: Graph) -> Result<(Graph, Vec<SideEffectDescriptor>)> {
        tracing::debug!(
            "Transforming graph {}: mapping cacheable targets to binaries",
            graph.name
        );

        let (hashes, replace_exempt) = {
            let traverser = GraphTraverser::new(&graph);
            let available: BTreeSet<String> = traverser
                .all_targets()
                .into_iter()
                .map(|target| target.target.name)
                .collect();
            let missing: Vec<String> = self
                .sources
                .iter()
                .filter(|source| !available.contains(*source))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(
                    MissingTargetsError::new(missing, available.into_iter().collect()).into(),
                );
            }

            let working_set: BTreeSet<String> = if self.sources.is_empty() {
                traverser
                    .all_internal_targets()
                    .into_iter()
                    .map(|target| target.target.name)
                    .collect()
            } else {
                self.sources.clone()
            };

            // Only explicitly named targets are withheld from hashing and
            // lookup; the defaulted working set still warms the cache.
            let hash_exclusions: BTreeSet<String> = self
                .excluded_sources
                .union(&self.sources)
                .cloned()
                .collect();
            let hashes = self.content_hasher.content_hashes(
                &graph,
                &self.profile,
                self.output_type,
                &hash_exclusions,
            )?;

            let replace_exempt: BTreeSet<String> = working_set
                .union(&self.excluded_sources)
                .cloned()
                .collect();
            (hashes, replace_exempt)
        };

        let artifacts = self.fetch_artifacts(hashes).await;
        tracing::debug!(
            "Fetched {} cached binaries for graph {}",
            artifacts.len(),
            graph.name
        );

        let mapped = self.mutator.map(graph, &artifacts, &replace_exempt);
        Ok((mapped, Vec::new()))
    }
}
