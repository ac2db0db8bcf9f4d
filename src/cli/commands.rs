//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "vulnrag")]
#[command(about = "Retrieval-augmented vulnerability assessment for cloud infrastructure")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS
        #[arg(long)]
        cors: bool,
    },
    /// Run the two-phase analysis on an infrastructure JSON file
    Analyze {
        /// Infrastructure description (JSON)
        file: PathBuf,
        /// Similarity threshold override
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Number of references to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Write the full result as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Show which reference scenarios match an infrastructure file
    Search {
        /// Infrastructure description (JSON)
        file: PathBuf,
        /// Similarity threshold override
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Number of references to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Embed a reference corpus file and store it in the vector index
    Ingest {
        /// JSON array of reference items
        file: PathBuf,
        /// Concurrent embedding requests
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },
    /// Show current configuration
    Config,
}
