// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::model::*;
    use crate::error::DecimateError;

    #[test]
    fn test_retention_limit_rejects_zero() {
        let err = RetentionLimit::new(0).unwrap_err();
        assert!(matches!(err, DecimateError::Config { .. }));
    }

    #[test]
    fn test_retention_limit_accepts_positive() {
        assert_eq!(RetentionLimit::new(1).unwrap().get(), 1);
        assert_eq!(RetentionLimit::new(42).unwrap().get(), 42);
    }

    #[test]
    fn test_retention_limit_from_signed() {
        assert_eq!(RetentionLimit::from_i64(2).unwrap().get(), 2);
        assert!(RetentionLimit::from_i64(0).is_err());
        assert!(RetentionLimit::from_i64(-3).is_err());
        assert!(RetentionLimit::from_i64(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_retention_limit_default() {
        assert_eq!(RetentionLimit::default().get(), RetentionLimit::DEFAULT);
        assert_eq!(format!("{}", RetentionLimit::default()), "3");
    }

    #[test]
    fn test_pixel_layout_sizes() {
        assert_eq!(PixelLayout::Bgr24.bytes_per_pixel(), 3);
        assert_eq!(PixelLayout::Rgb24.bytes_per_pixel(), 3);
        assert_eq!(PixelLayout::Rgba.bytes_per_pixel(), 4);
        assert_eq!(PixelLayout::Gray8.bytes_per_pixel(), 1);
    }

    #[test]
    fn test_solid_frame_is_well_formed() {
        let frame = Frame::solid_bgr(4, 3, [10, 20, 30]);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.data().len(), 36);
        assert_eq!(&frame.data()[..6], &[10, 20, 30, 10, 20, 30]);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_truncated_frame_is_malformed() {
        let frame = Frame::new(4, 4, PixelLayout::Gray8, vec![0; 15]);
        assert_eq!(frame.expected_len(), 16);
        assert!(!frame.is_well_formed());

        let empty = Frame::new(0, 4, PixelLayout::Gray8, vec![]);
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn test_frame_rate_validation() {
        let rate = FrameRate::new(30000, 1001).unwrap();
        assert!((rate.as_f64() - 29.97).abs() < 0.01);
        assert!(FrameRate::new(0, 1).is_err());
        assert!(FrameRate::new(25, 0).is_err());
    }

    #[test]
    fn test_frame_rate_display() {
        let rate = FrameRate::new(25, 1).unwrap();
        assert_eq!(format!("{}", rate), "25.000 fps (25/1)");
        assert_eq!(rate.frame_duration(), 0.04);
    }

    #[test]
    fn test_stream_info_serializes() {
        let info = StreamInfo::new(640, 480, FrameRate::new(30, 1).unwrap()).with_frame_count(90);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["width"], 640);
        assert_eq!(json["frame_rate"]["num"], 30);
        assert_eq!(json["frame_count"], 90);
    }

    #[test]
    fn test_decision_is_keep() {
        assert!(Decision::Keep.is_keep());
        assert!(!Decision::Drop.is_keep());
    }
}
