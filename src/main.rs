//! Gantry CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Project generation and build orchestration for Xcode workspaces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workspace root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mapper pipeline over a serialized dependency graph
    Map {
        /// Path to the graph JSON produced by the manifest loader
        graph: PathBuf,

        /// Where to write the mapped graph JSON
        #[arg(short, long, default_value = "graph.mapped.json")]
        output: PathBuf,

        /// Targets to keep as source (focus); defaults to all internal targets
        #[arg(short, long)]
        sources: Vec<String>,

        /// Targets never replaced by cached binaries
        #[arg(short, long)]
        excluded: Vec<String>,

        /// Skip the test-result cache mapper
        #[arg(long)]
        skip_tests_cache: bool,
    },
    /// Print content hashes for every target in a serialized graph
    Hash {
        /// Path to the graph JSON produced by the manifest loader
        graph: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("gantry={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Gantry v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Map {
            graph,
            output,
            sources,
            excluded,
            skip_tests_cache,
        } => commands::map(cli.root, graph, output, sources, excluded, skip_tests_cache).await,
        Commands::Hash { graph } => commands::hash(graph),
        Commands::Version => {
            println!("Gantry v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
