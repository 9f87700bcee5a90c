//! CLI module for decimx
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

pub use args::{AnalyzeArgs, DecimateArgs, InspectArgs, RetentionArgs};

/// decimx frame decimator
///
/// Drops frames from runs of identical consecutive frames, keeping at most
/// the first N of every run.
#[derive(Parser, Debug)]
#[command(name = "decimx")]
#[command(about = "Remove long runs of repeated frames from a video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "DECIMX_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, env = "DECIMX_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Configuration file (default: ./decimx.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a copy of a video with repeated frames removed
    Decimate(DecimateArgs),
    /// Show stream information of a video file
    Inspect(InspectArgs),
    /// Count runs and droppable frames without writing output
    Analyze(AnalyzeArgs),
}
