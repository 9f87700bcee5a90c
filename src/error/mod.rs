//! Error handling module for decimx

use thiserror::Error;

/// Main error type for decimx operations
#[derive(Error, Debug)]
pub enum DecimateError {
    /// Invalid retention parameter or configuration, raised before any frame is read
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    /// Output file already exists and overwriting was not requested
    #[error("Output file already exists: {path} (pass --overwrite to replace it)")]
    OutputExists { path: String },

    /// A frame could not be reduced to a comparison key
    #[error("Failed to decode frame {index}: {message}")]
    Decode { index: u64, message: String },

    /// Shape mismatch or corrupt unit reported by the source
    #[error("Stream error at frame {index}: {message}")]
    Stream { index: u64, message: String },

    /// The sink rejected a write
    #[error("Failed to write frame {index}: {message}")]
    Sink { index: u64, message: String },

    /// Processing was aborted between frames
    #[error("Processing cancelled before frame {index}")]
    Cancelled { index: u64 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] ffmpeg_next::Error),
}

impl DecimateError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Frame index the error refers to, if any
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::Decode { index, .. }
            | Self::Stream { index, .. }
            | Self::Sink { index, .. }
            | Self::Cancelled { index } => Some(*index),
            _ => None,
        }
    }
}

/// Result type alias for decimx operations
pub type DecimateResult<T> = std::result::Result<T, DecimateError>;
