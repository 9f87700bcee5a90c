//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::engine::KeyMode;

fn parse_num_repeats(s: &str) -> Result<u32, String> {
    number_range(s, 1, u32::MAX)
}

/// Retention options shared by `decimate` and `analyze`
#[derive(Args, Debug, Clone)]
pub struct RetentionArgs {
    /// Frames kept from each run of identical frames (>= 1, default 3)
    #[arg(short = 'n', long, env = "DECIMX_NUM_REPEATS", value_parser = parse_num_repeats)]
    pub num_repeats: Option<u32>,

    /// How frames are compared: luma or exact
    #[arg(long, env = "DECIMX_KEY_MODE")]
    pub key_mode: Option<KeyMode>,
}

/// Arguments for the decimate command
#[derive(Args, Debug, Clone)]
pub struct DecimateArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output video file path
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub retention: RetentionArgs,

    /// Encoder name (default: mpeg4)
    #[arg(long, env = "DECIMX_CODEC")]
    pub codec: Option<String>,

    /// Target bit rate in bits per second
    #[arg(long)]
    pub bit_rate: Option<usize>,

    /// Constant Rate Factor, for encoders that support it
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=63))]
    pub crf: Option<u8>,

    /// Replace the output file if it exists
    #[arg(long)]
    pub overwrite: bool,

    /// Emit progress and the final report as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Do not report progress
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the analyze command
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub retention: RetentionArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
