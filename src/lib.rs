//! decimx frame decimator library
//!
//! Removes long runs of identical consecutive frames from a video while
//! keeping the first few frames of every run.
//!
//! The core is source and sink agnostic: [`engine::DecimationPipeline`]
//! pulls frames from any [`ports::FrameSource`] and forwards the kept ones
//! to any [`ports::FrameSink`]. libav-backed implementations live in
//! [`adapters`].

pub mod adapters;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

use std::sync::Once;

// Re-export commonly used types
pub use domain::model::{Decision, Frame, FrameKey, FrameRate, PixelLayout, RetentionLimit, StreamInfo};
pub use domain::rules::RunLengthGate;
pub use engine::{DecimationPipeline, FrameComparator, KeyMode, PipelineReport};
pub use error::{DecimateError, DecimateResult};
pub use ports::{FrameSink, FrameSource};

static QUIET_LIBAV: Once = Once::new();

/// Initialize libav. Safe to call more than once.
pub fn init() -> DecimateResult<()> {
    ffmpeg_next::init()?;
    QUIET_LIBAV.call_once(|| {
        ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    });
    Ok(())
}
