//! decimx frame decimator
//!
//! Keeps at most the first N frames of every run of identical consecutive
//! frames and writes the result as a new video.
//!
//! # Usage
//!
//! ```bash
//! decimx decimate -i input.mp4 -o output.mp4 -n 3
//! decimx analyze -i input.mp4 -n 1 --json
//! decimx inspect -i input.mp4
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use decimx_cli::adapters::toml_config::FileConfig;
use decimx_cli::cli::{commands, Cli, Commands};
use decimx_cli::config_initialization::resolve_logging;

/// Main entry point for the decimx CLI application
fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let file_config =
        FileConfig::discover(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    resolve_logging(&cli, &file_config)
        .initialize()
        .context("Failed to initialize logging")?;

    info!("Starting decimx {}", env!("CARGO_PKG_VERSION"));

    // Execute the requested command
    match cli.command {
        Commands::Decimate(args) => {
            info!("Executing decimate command");
            commands::decimate(args, &file_config)?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(args)?;
        }
        Commands::Analyze(args) => {
            info!("Executing analyze command");
            commands::analyze(args, &file_config)?;
        }
    }

    info!("decimx completed successfully");
    Ok(())
}
