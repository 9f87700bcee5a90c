// Domain models - Core types and data structures

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::{DecimateError, DecimateResult};

/// Memory layout of the samples in a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    /// 8-bit blue, green, red
    Bgr24,
    /// 8-bit red, green, blue
    Rgb24,
    /// 8-bit red, green, blue, alpha
    Rgba,
    /// 8-bit single-channel intensity
    Gray8,
}

impl PixelLayout {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Bgr24 | PixelLayout::Rgb24 => 3,
            PixelLayout::Rgba => 4,
            PixelLayout::Gray8 => 1,
        }
    }
}

/// One decoded picture, rows packed without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a packed pixel buffer. The buffer length is not checked here;
    /// the comparator rejects malformed frames with their stream position.
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            layout,
            data,
        }
    }

    /// Frame filled with one BGR color
    pub fn solid_bgr(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let data = bgr.iter().copied().cycle().take(pixels * 3).collect();
        Self::new(width, height, PixelLayout::Bgr24, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Buffer length implied by the declared shape
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.bytes_per_pixel()
    }

    /// Whether the declared shape is consistent with the buffer
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Comparable representation of a frame; equal keys mean identical frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameKey {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u8>,
}

/// Maximum number of consecutive equal frames kept in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetentionLimit(NonZeroU32);

impl RetentionLimit {
    /// Number of repeats kept when nothing is configured
    pub const DEFAULT: u32 = 3;

    /// Validate a retention limit; zero is rejected
    pub fn new(n: u32) -> DecimateResult<Self> {
        NonZeroU32::new(n).map(Self).ok_or_else(|| {
            DecimateError::config("retention limit must be at least 1 (got 0)")
        })
    }

    /// Validate a signed value such as one read from a config file
    pub fn from_i64(n: i64) -> DecimateResult<Self> {
        let n = u32::try_from(n).map_err(|_| {
            DecimateError::config(format!("retention limit must be between 1 and {} (got {})", u32::MAX, n))
        })?;
        Self::new(n)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for RetentionLimit {
    fn default() -> Self {
        Self(NonZeroU32::new(Self::DEFAULT).unwrap_or(NonZeroU32::MIN))
    }
}

impl fmt::Display for RetentionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keep/drop verdict for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Drop,
}

impl Decision {
    pub fn is_keep(self) -> bool {
        self == Decision::Keep
    }
}

/// Rational frame rate as declared by the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: i32,
    pub den: i32,
}

impl FrameRate {
    /// Create a frame rate; a zero or negative component is rejected
    pub fn new(num: i32, den: i32) -> DecimateResult<Self> {
        if num <= 0 || den <= 0 {
            return Err(DecimateError::config(format!(
                "frame rate must be positive (got {}/{})",
                num, den
            )));
        }
        Ok(Self { num, den })
    }

    /// Frames per second
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Duration of one frame in seconds
    pub fn frame_duration(&self) -> f64 {
        self.den as f64 / self.num as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} fps ({}/{})", self.as_f64(), self.num, self.den)
    }
}

/// Stream metadata reported by a source before iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Nominal frame rate
    pub frame_rate: FrameRate,
    /// Total frame count, if the container declares it
    pub frame_count: Option<u64>,
    /// Codec name
    pub codec: String,
    /// Duration in seconds, if known
    pub duration_seconds: Option<f64>,
}

impl StreamInfo {
    /// Minimal metadata for synthetic streams
    pub fn new(width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            width,
            height,
            frame_rate,
            frame_count: None,
            codec: "rawvideo".to_string(),
            duration_seconds: None,
        }
    }

    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.frame_count = Some(frame_count);
        self
    }
}

#[cfg(test)]
mod tests;
