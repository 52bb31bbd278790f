//! CLI command implementations

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use gantry_cache::{
    CacheCategory, CacheConfig, CacheDirectoriesProvider, CacheStoring, LocalCacheStorage,
};
use gantry_core::{Graph, GraphMapping, SideEffectDescriptor};
use gantry_hasher::{ContentHasher, GraphContentHasher};
use gantry_kit::{PipelineOptions, default_mapper_pipeline};

pub async fn map(
    root: PathBuf,
    graph_path: PathBuf,
    output: PathBuf,
    sources: Vec<String>,
    excluded: Vec<String>,
    skip_tests_cache: bool,
) -> anyhow::Result<()> {
    let graph = load_graph(&graph_path)?;
    tracing::info!(
        "Loaded graph {} with {} targets from {}",
        graph.name,
        graph.target_count(),
        graph_path.display()
    );

    let config = load_config(&root)?;
    let directories = CacheDirectoriesProvider::new(&config, &root);
    let cache: Arc<dyn CacheStoring> = Arc::new(LocalCacheStorage::new(
        directories.cache_directory(CacheCategory::Binaries),
    ));

    let pipeline = default_mapper_pipeline(
        cache,
        &config,
        &root,
        PipelineOptions {
            sources: sources.into_iter().collect::<BTreeSet<String>>(),
            excluded_sources: excluded.into_iter().collect::<BTreeSet<String>>(),
            skip_tests_cache,
            ..PipelineOptions::default()
        },
    );

    let (mapped, side_effects) = pipeline.map(graph).await?;

    let file = std::fs::File::create(&output)
        .with_context(|| format!("Unable to write mapped graph to {}", output.display()))?;
    serde_json::to_writer_pretty(file, &mapped)?;

    tracing::info!(
        "Mapped graph has {} targets; wrote {}",
        mapped.target_count(),
        output.display()
    );
    // Side effects are staged for an external executor; report them only.
    for side_effect in &side_effects {
        match side_effect {
            SideEffectDescriptor::File(descriptor) => {
                tracing::info!("Staged file side effect: {}", descriptor.path.display());
            }
            SideEffectDescriptor::Directory(descriptor) => {
                tracing::info!("Staged directory side effect: {}", descriptor.path.display());
            }
        }
    }

    Ok(())
}

pub fn hash(graph_path: PathBuf) -> anyhow::Result<()> {
    let graph = load_graph(&graph_path)?;
    let hasher = GraphContentHasher::new(ContentHasher::new());
    let hashes = hasher.content_hashes(&graph, |_| true, &[])?;

    for (target, hash) in &hashes {
        println!("{}\t{}", target.target.name, hash);
    }

    Ok(())
}

fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Unable to read graph at {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Unable to parse graph at {}", path.display()))
}

fn load_config(root: &Path) -> anyhow::Result<CacheConfig> {
    let path = root.join("gantry.toml");
    if path.exists() {
        CacheConfig::load(&path)
    } else {
        Ok(CacheConfig::default())
    }
}
