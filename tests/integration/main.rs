//! Integration tests for Gantry
//!
//! These tests run the whole mapper pipeline against a real on-disk cache.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use gantry_cache::{
    CacheCategory, CacheConfig, CacheDirectoriesProvider, CacheGraphContentHasher,
    CacheOutputType, CacheStoring, LocalCacheStorage,
};
use gantry_core::fixtures;
use gantry_core::{Graph, GraphDependency, GraphMapping, Scheme, Target};
use gantry_hasher::{ContentHasher, GraphContentHasher};
use gantry_kit::{PipelineOptions, default_mapper_pipeline};

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new("cargo")
        .args(["run", "--", "--help"])
        .current_dir(".")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gantry"));
    assert!(stdout.contains("build orchestration"));
}

/// App -> CoreKit, CoreKitTests -> CoreKit, with CoreKit's source on disk.
fn workspace_graph(sources_dir: &Path) -> Graph {
    let core_source = sources_dir.join("CoreKit.swift");

    fixtures::GraphBuilder::new("workspace")
        .project(
            fixtures::project("/app"),
            vec![
                fixtures::app_target("App"),
                Target {
                    sources: vec![core_source],
                    ..fixtures::target("CoreKit")
                },
                fixtures::unit_tests_target("CoreKitTests"),
            ],
        )
        .dependency(("/app", "App"), ("/app", "CoreKit"))
        .dependency(("/app", "CoreKitTests"), ("/app", "CoreKit"))
        .workspace_scheme(Scheme {
            build_action: Some(fixtures::build_action(&[
                ("/app", "App"),
                ("/app", "CoreKitTests"),
            ])),
            test_action: Some(fixtures::test_action(&[("/app", "CoreKitTests")])),
            ..fixtures::scheme("Workspace")
        })
        .build()
}

fn pipeline_options(sources: &[&str]) -> PipelineOptions {
    PipelineOptions {
        sources: sources.iter().map(|name| name.to_string()).collect(),
        ..PipelineOptions::default()
    }
}

/// Test that a warm cache substitutes the focused-out framework and
/// tree-shaking removes its source target
#[tokio::test]
async fn test_pipeline_substitutes_cached_binaries() {
    let workspace_root = TempDir::new().unwrap();
    std::fs::write(workspace_root.path().join("CoreKit.swift"), "let x = 1").unwrap();
    let graph = workspace_graph(workspace_root.path());

    let config = CacheConfig::default();
    let directories = CacheDirectoriesProvider::new(&config, workspace_root.path());
    let storage = LocalCacheStorage::new(directories.cache_directory(CacheCategory::Binaries));

    // Warm the cache with an artifact under CoreKit's content hash, exactly
    // as the mapper will compute it (sources = {App} is withheld).
    let hasher = CacheGraphContentHasher::new(GraphContentHasher::new(ContentHasher::new()));
    let hashes = hasher
        .content_hashes(
            &graph,
            &config.profile,
            CacheOutputType::Xcframework,
            &BTreeSet::from(["App".to_string()]),
        )
        .unwrap();
    assert_eq!(hashes.len(), 1);
    let core_hash = hashes.values().next().unwrap();

    let artifact = workspace_root.path().join("CoreKit.xcframework");
    std::fs::create_dir(&artifact).unwrap();
    std::fs::write(artifact.join("Info.plist"), b"plist").unwrap();
    storage.store("CoreKit", core_hash, &[artifact]).await.unwrap();

    let pipeline = default_mapper_pipeline(
        Arc::new(storage),
        &config,
        workspace_root.path(),
        pipeline_options(&["App"]),
    );
    let (mapped, side_effects) = pipeline.map(graph).await.unwrap();

    // CoreKit is linked as a binary and its source target is shaken off;
    // CoreKitTests falls outside the focus and disappears with it.
    let app_path = Path::new("/app");
    assert!(mapped.target(app_path, "App").is_some());
    assert!(mapped.target(app_path, "CoreKit").is_none());
    assert!(mapped.target(app_path, "CoreKitTests").is_none());

    let expected_artifact = directories
        .cache_directory(CacheCategory::Binaries)
        .join(core_hash)
        .join("CoreKit.xcframework");
    assert_eq!(
        mapped.dependencies_of(&GraphDependency::target("App", "/app")),
        BTreeSet::from([GraphDependency::Xcframework {
            path: expected_artifact,
        }])
    );

    // The scheme survives, filtered down to what still builds from source.
    assert_eq!(mapped.workspace.schemes.len(), 1);
    let build_targets: Vec<&str> = mapped.workspace.schemes[0]
        .build_action
        .as_ref()
        .unwrap()
        .targets
        .iter()
        .map(|reference| reference.name.as_str())
        .collect();
    assert_eq!(build_targets, vec!["App"]);

    // Test hash markers were staged for the external executor.
    assert!(!side_effects.is_empty());
}

/// Test that a cold cache leaves the whole graph building from source
#[tokio::test]
async fn test_pipeline_with_cold_cache_keeps_sources() {
    let workspace_root = TempDir::new().unwrap();
    std::fs::write(workspace_root.path().join("CoreKit.swift"), "let x = 1").unwrap();
    let graph = workspace_graph(workspace_root.path());

    let config = CacheConfig::default();
    let directories = CacheDirectoriesProvider::new(&config, workspace_root.path());
    let storage = LocalCacheStorage::new(directories.cache_directory(CacheCategory::Binaries));

    let pipeline = default_mapper_pipeline(
        Arc::new(storage),
        &config,
        workspace_root.path(),
        pipeline_options(&[]),
    );
    let (mapped, _) = pipeline.map(graph.clone()).await.unwrap();

    // Nothing could be fetched, so the graph keeps every target.
    assert_eq!(mapped.target_count(), graph.target_count());
    assert_eq!(
        mapped.dependencies_of(&GraphDependency::target("App", "/app")),
        BTreeSet::from([GraphDependency::target("CoreKit", "/app")])
    );
}

/// Test that committed test hashes skip the test targets on the next run
#[tokio::test]
async fn test_pipeline_skips_tests_after_successful_run() {
    let workspace_root = TempDir::new().unwrap();
    std::fs::write(workspace_root.path().join("CoreKit.swift"), "let x = 1").unwrap();
    let graph = workspace_graph(workspace_root.path());

    let config = CacheConfig::default();
    let directories = CacheDirectoriesProvider::new(&config, workspace_root.path());
    let tests_dir = directories.cache_directory(CacheCategory::Tests);
    std::fs::create_dir_all(&tests_dir).unwrap();

    let run = |graph: Graph| {
        let storage =
            LocalCacheStorage::new(directories.cache_directory(CacheCategory::Binaries));
        let pipeline = default_mapper_pipeline(
            Arc::new(storage),
            &config,
            workspace_root.path(),
            pipeline_options(&[]),
        );
        async move { pipeline.map(graph).await.unwrap() }
    };

    let (first, side_effects) = run(graph.clone()).await;
    assert_eq!(
        first.workspace.schemes[0]
            .test_action
            .as_ref()
            .unwrap()
            .targets
            .len(),
        1
    );

    // Commit the staged markers, as the executor would after green tests.
    for side_effect in &side_effects {
        if let gantry_core::SideEffectDescriptor::File(descriptor) = side_effect {
            std::fs::write(&descriptor.path, b"").unwrap();
        }
    }

    let (second, _) = run(graph).await;
    assert!(
        second.workspace.schemes[0]
            .test_action
            .as_ref()
            .unwrap()
            .targets
            .is_empty()
    );
    // The skipped test target no longer needs to build either.
    let build_targets: Vec<&str> = second.workspace.schemes[0]
        .build_action
        .as_ref()
        .unwrap()
        .targets
        .iter()
        .map(|reference| reference.name.as_str())
        .collect();
    assert_eq!(build_targets, vec!["App"]);
}

/// Test that graph JSON written by one process round-trips into the next
#[test]
fn test_graph_round_trips_through_json_files() {
    let dir = TempDir::new().unwrap();
    let graph = workspace_graph(dir.path());
    let path = dir.path().join("graph.json");

    let file = std::fs::File::create(&path).unwrap();
    serde_json::to_writer_pretty(file, &graph).unwrap();

    let reloaded: Graph =
        serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(graph, reloaded);
}

/// Test configuration loading from a workspace-root gantry.toml
#[test]
fn test_configuration_loading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gantry.toml");
    std::fs::write(
        &path,
        "directory = \"/var/cache/gantry\"\n\n[profile]\nname = \"CI\"\nconfiguration = \"Release\"\n",
    )
    .unwrap();

    let config = CacheConfig::load(&path).unwrap();
    assert_eq!(config.directory, Some(PathBuf::from("/var/cache/gantry")));
    assert_eq!(config.profile.configuration, "Release");

    let provider = CacheDirectoriesProvider::new(&config, dir.path());
    assert_eq!(
        provider.cache_directory(CacheCategory::Binaries),
        PathBuf::from("/var/cache/gantry/binaries")
    );
}
