//! Frame key derivation and exact comparison

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::model::{Frame, FrameKey, PixelLayout};
use crate::error::{DecimateError, DecimateResult};

// BT.601 luma weights in 14-bit fixed point
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Representation frames are reduced to before comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Single-channel intensity; chroma-only differences compare equal
    #[default]
    Luma,
    /// Every pixel byte as decoded
    Exact,
}

impl FromStr for KeyMode {
    type Err = DecimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "luma" | "gray" | "grayscale" => Ok(KeyMode::Luma),
            "exact" | "raw" => Ok(KeyMode::Exact),
            other => Err(DecimateError::config(format!(
                "unknown key mode '{}' (expected 'luma' or 'exact')",
                other
            ))),
        }
    }
}

/// Stateless frame comparator
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameComparator {
    mode: KeyMode,
}

impl FrameComparator {
    pub fn new(mode: KeyMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    /// Reduce a frame to its comparison key. `index` is the stream position
    /// used for error reporting only; it never affects the key.
    pub fn derive_key(&self, frame: &Frame, index: u64) -> DecimateResult<FrameKey> {
        if !frame.is_well_formed() {
            return Err(DecimateError::Decode {
                index,
                message: format!(
                    "buffer holds {} bytes, {}x{} {:?} needs {}",
                    frame.data().len(),
                    frame.width(),
                    frame.height(),
                    frame.layout(),
                    frame.expected_len()
                ),
            });
        }

        let samples = match self.mode {
            KeyMode::Exact => frame.data().to_vec(),
            KeyMode::Luma => luma(frame),
        };

        Ok(FrameKey {
            width: frame.width(),
            height: frame.height(),
            samples,
        })
    }

    /// Reject a frame whose size differs from the size the stream declared.
    ///
    /// A declared dimension of zero means the source could not tell, and is
    /// not checked.
    pub fn check_declared_shape(&self, frame: &Frame, declared: (u32, u32), index: u64) -> DecimateResult<()> {
        let (width, height) = declared;
        if width == 0 || height == 0 || frame.dimensions() == declared {
            return Ok(());
        }
        Err(DecimateError::Decode {
            index,
            message: format!(
                "frame is {}x{}, stream declares {}x{}",
                frame.width(),
                frame.height(),
                width,
                height
            ),
        })
    }

    /// Exact element-wise equality, no tolerance
    pub fn equal(&self, a: &FrameKey, b: &FrameKey) -> bool {
        a == b
    }
}

fn luma(frame: &Frame) -> Vec<u8> {
    let data = frame.data();
    match frame.layout() {
        PixelLayout::Gray8 => data.to_vec(),
        PixelLayout::Bgr24 => data
            .chunks_exact(3)
            .map(|px| weigh(px[2], px[1], px[0]))
            .collect(),
        PixelLayout::Rgb24 => data
            .chunks_exact(3)
            .map(|px| weigh(px[0], px[1], px[2]))
            .collect(),
        PixelLayout::Rgba => data
            .chunks_exact(4)
            .map(|px| weigh(px[0], px[1], px[2]))
            .collect(),
    }
}

fn weigh(r: u8, g: u8, b: u8) -> u8 {
    let y = (LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32 + LUMA_ROUND) >> LUMA_SHIFT;
    y.min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_of_primaries() {
        assert_eq!(weigh(0, 0, 0), 0);
        assert_eq!(weigh(255, 255, 255), 255);
        assert_eq!(weigh(255, 0, 0), 76);
        assert_eq!(weigh(0, 255, 0), 150);
        assert_eq!(weigh(0, 0, 255), 29);
    }

    #[test]
    fn test_layouts_agree_on_luma() {
        let comparator = FrameComparator::new(KeyMode::Luma);
        let bgr = Frame::new(2, 1, PixelLayout::Bgr24, vec![30, 20, 10, 0, 0, 255]);
        let rgb = Frame::new(2, 1, PixelLayout::Rgb24, vec![10, 20, 30, 255, 0, 0]);
        let rgba = Frame::new(2, 1, PixelLayout::Rgba, vec![10, 20, 30, 0, 255, 0, 0, 9]);

        let a = comparator.derive_key(&bgr, 0).unwrap();
        let b = comparator.derive_key(&rgb, 0).unwrap();
        let c = comparator.derive_key(&rgba, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.samples.len(), 2);
    }

    #[test]
    fn test_luma_ignores_chroma_only_difference() {
        let comparator = FrameComparator::new(KeyMode::Luma);
        // Both pixels reduce to the same intensity.
        let a = Frame::new(1, 1, PixelLayout::Rgb24, vec![255, 0, 0]);
        let b = Frame::new(1, 1, PixelLayout::Rgb24, vec![254, 0, 1]);
        let ka = comparator.derive_key(&a, 0).unwrap();
        let kb = comparator.derive_key(&b, 1).unwrap();
        assert!(comparator.equal(&ka, &kb));

        let exact = FrameComparator::new(KeyMode::Exact);
        let ka = exact.derive_key(&a, 0).unwrap();
        let kb = exact.derive_key(&b, 1).unwrap();
        assert!(!exact.equal(&ka, &kb));
    }

    #[test]
    fn test_single_sample_difference_is_unequal() {
        let comparator = FrameComparator::default();
        let a = Frame::new(3, 1, PixelLayout::Gray8, vec![1, 2, 3]);
        let b = Frame::new(3, 1, PixelLayout::Gray8, vec![1, 2, 4]);
        let ka = comparator.derive_key(&a, 0).unwrap();
        let kb = comparator.derive_key(&b, 1).unwrap();
        assert!(!comparator.equal(&ka, &kb));
    }

    #[test]
    fn test_key_ignores_position() {
        let comparator = FrameComparator::default();
        let frame = Frame::solid_bgr(4, 4, [1, 2, 3]);
        assert_eq!(
            comparator.derive_key(&frame, 0).unwrap(),
            comparator.derive_key(&frame, 99).unwrap()
        );
    }

    #[test]
    fn test_malformed_frame_reports_index() {
        let comparator = FrameComparator::default();
        let frame = Frame::new(4, 4, PixelLayout::Bgr24, vec![0; 10]);
        match comparator.derive_key(&frame, 7) {
            Err(DecimateError::Decode { index, .. }) => assert_eq!(index, 7),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_shape_mismatch_reports_index() {
        let comparator = FrameComparator::default();
        let frame = Frame::solid_bgr(5, 3, [9, 9, 9]);
        assert!(frame.is_well_formed());
        assert!(comparator.check_declared_shape(&frame, (5, 3), 0).is_ok());
        match comparator.check_declared_shape(&frame, (4, 3), 4) {
            Err(DecimateError::Decode { index, .. }) => assert_eq!(index, 4),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_declared_shape_is_not_checked() {
        let comparator = FrameComparator::default();
        let frame = Frame::solid_bgr(5, 3, [9, 9, 9]);
        assert!(comparator.check_declared_shape(&frame, (0, 0), 0).is_ok());
    }

    #[test]
    fn test_key_mode_parse() {
        assert_eq!("luma".parse::<KeyMode>().unwrap(), KeyMode::Luma);
        assert_eq!("Exact".parse::<KeyMode>().unwrap(), KeyMode::Exact);
        assert!("fuzzy".parse::<KeyMode>().is_err());
    }
}
