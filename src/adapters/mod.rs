// Adapters - External system implementations

pub mod sink_libav;
pub mod source_libav;
pub mod toml_config;

// Re-export adapters
pub use sink_libav::{EncoderSettings, LibavFrameSink};
pub use source_libav::LibavFrameSource;
pub use toml_config::FileConfig;
