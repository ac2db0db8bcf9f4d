use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use vulnrag::cli::handlers::*;
use vulnrag::cli::Cli;
use vulnrag::cli::Commands;
use vulnrag::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_layered(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };

    vulnrag::logging::apply_backtrace_setting(&config);

    // Initialize logging
    if cli.verbose {
        vulnrag::logging::init_logging_with_level("debug")?;
    } else {
        vulnrag::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Serve { host, port, cors } => {
            handle_serve_api(&config, host, port, cors).await?;
        }
        Commands::Analyze {
            file,
            threshold,
            top_k,
            output,
            json,
        } => {
            handle_analyze_command(&config, file, threshold, top_k, output, json).await?;
        }
        Commands::Search {
            file,
            threshold,
            top_k,
        } => {
            handle_search_command(&config, file, threshold, top_k).await?;
        }
        Commands::Ingest { file, concurrency } => {
            handle_ingest_command(&config, file, concurrency).await?;
        }
        Commands::Config => {
            handle_config_command(&config)?;
        }
    }

    Ok(())
}
