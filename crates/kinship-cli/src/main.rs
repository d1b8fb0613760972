//! Kinship CLI - Command-line interface for Kinship
//!
//! This is the main entry point for users interacting with Kinship.
//! It provides commands for resolving relationships, inspecting trees
//! and serving the resolver over WebSocket.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "kinship")]
#[command(author = "Kinship Contributors")]
#[command(version)]
#[command(about = "Find out how two people in a family tree are related", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Kinship in the current directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Resolve the relationship between two persons
    Resolve {
        /// First person id
        person1: String,

        /// Second person id
        person2: String,

        /// Directory holding <tree>.json snapshots
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Tree(s) to search; several trees are merged. Defaults to all trees
        #[arg(short, long = "tree")]
        trees: Vec<String>,

        /// Read a single snapshot file instead of a data directory
        #[arg(short, long, conflicts_with_all = ["data", "trees"])]
        file: Option<PathBuf>,

        /// Maximum path length in hops
        #[arg(long)]
        depth: Option<usize>,

        /// Label language
        #[arg(short, long)]
        lang: Option<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show statistics and parent-child cycles of a tree
    Inspect {
        /// Tree id
        tree: String,

        /// Directory holding <tree>.json snapshots
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Start the Kinship server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7433")]
        port: u16,

        /// Headless mode: bind to 0.0.0.0 for remote access (WSL/Docker/Server)
        #[arg(long)]
        headless: bool,

        /// Directory holding <tree>.json snapshots
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Resolve {
            person1,
            person2,
            data,
            trees,
            file,
            depth,
            lang,
            json,
        } => commands::resolve(commands::ResolveArgs {
            person1,
            person2,
            data,
            trees,
            file,
            depth,
            lang,
            json,
        }),
        Commands::Inspect { tree, data, json } => commands::inspect(&tree, data.as_deref(), json),
        Commands::Serve {
            port,
            headless,
            data,
        } => commands::serve(port, headless, data.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
