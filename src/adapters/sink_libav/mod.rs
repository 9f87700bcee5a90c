//! Frame sink backed by libav encoding and muxing
//!
//! Frames are encoded at the source's nominal frame rate with consecutive
//! timestamps. Dropped frames are not compensated for.

use std::fmt;
use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::{Frame, PixelLayout, StreamInfo};
use crate::error::{DecimateError, DecimateResult};
use crate::ports::FrameSink;

/// Encoder selection and quality knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Encoder name as known to libav (e.g. `mpeg4`, `libx264`, `ffv1`)
    pub codec: String,
    /// Target bit rate in bits per second
    pub bit_rate: Option<usize>,
    /// Constant rate factor, passed to encoders that understand it
    pub crf: Option<u8>,
}

impl EncoderSettings {
    /// MPEG-4 Part 2, the `mp4v` fourcc
    pub const DEFAULT_CODEC: &'static str = "mpeg4";
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: Self::DEFAULT_CODEC.to_string(),
            bit_rate: None,
            crf: None,
        }
    }
}

/// Encoding frame sink
pub struct LibavFrameSink {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::codec::encoder::Video,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    pixel: ffmpeg::format::Pixel,
    width: u32,
    height: u32,
    scaler: Option<(ScalingContext, ffmpeg::format::Pixel)>,
    next_pts: i64,
    bytes_written: u64,
    finished: bool,
}

impl LibavFrameSink {
    /// Create `path` and write the container header.
    ///
    /// The stream carries the same frame size and nominal frame rate as
    /// `info`.
    pub fn create(path: &Path, info: &StreamInfo, settings: &EncoderSettings) -> DecimateResult<Self> {
        crate::init()?;

        let codec = ffmpeg::codec::encoder::find_by_name(&settings.codec).ok_or_else(|| {
            DecimateError::config(format!("encoder '{}' is not available", settings.codec))
        })?;

        let pixel = codec
            .video()
            .ok()
            .and_then(|video| video.formats().and_then(|mut formats| formats.next()))
            .unwrap_or(ffmpeg::format::Pixel::YUV420P);

        let mut output = ffmpeg::format::output(&path)?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let frame_rate = ffmpeg::Rational::new(info.frame_rate.num, info.frame_rate.den);
        let time_base = frame_rate.invert();

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder.set_width(info.width);
        encoder.set_height(info.height);
        encoder.set_format(pixel);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(frame_rate));
        if let Some(bit_rate) = settings.bit_rate {
            encoder.set_bit_rate(bit_rate);
        }
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let mut options = ffmpeg::Dictionary::new();
        if let Some(crf) = settings.crf {
            options.set("crf", &crf.to_string());
        }
        let encoder = encoder.open_with(options).map_err(|e| {
            DecimateError::config(format!("cannot open encoder '{}': {}", settings.codec, e))
        })?;

        let stream_index = {
            let mut stream = output.add_stream(codec)?;
            stream.set_parameters(&encoder);
            stream.set_time_base(time_base);
            stream.set_avg_frame_rate(frame_rate);
            stream.index()
        };

        output.write_header()?;
        let stream_time_base = output
            .stream(stream_index)
            .map_or(time_base, |stream| stream.time_base());

        info!(
            "Writing {}: {}x{} {} ({:?}) @ {}",
            path.display(),
            info.width,
            info.height,
            settings.codec,
            pixel,
            info.frame_rate
        );

        Ok(Self {
            output,
            encoder,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base,
            pixel,
            width: info.width,
            height: info.height,
            scaler: None,
            next_pts: 0,
            bytes_written: 0,
            finished: false,
        })
    }

    /// Frames handed to the encoder so far
    pub fn frames_written(&self) -> u64 {
        self.next_pts as u64
    }

    /// Encoded payload bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn sink_error(&self, message: impl fmt::Display) -> DecimateError {
        DecimateError::Sink {
            index: self.next_pts as u64,
            message: message.to_string(),
        }
    }

    fn source_pixel(layout: PixelLayout) -> ffmpeg::format::Pixel {
        match layout {
            PixelLayout::Bgr24 => ffmpeg::format::Pixel::BGR24,
            PixelLayout::Rgb24 => ffmpeg::format::Pixel::RGB24,
            PixelLayout::Rgba => ffmpeg::format::Pixel::RGBA,
            PixelLayout::Gray8 => ffmpeg::format::Pixel::GRAY8,
        }
    }

    /// Copy a packed frame into a libav picture with its own stride
    fn to_picture(frame: &Frame, pixel: ffmpeg::format::Pixel) -> ffmpeg::frame::Video {
        let mut picture = ffmpeg::frame::Video::new(pixel, frame.width(), frame.height());
        let row_len = frame.width() as usize * frame.layout().bytes_per_pixel();
        let stride = picture.stride(0);
        let plane = picture.data_mut(0);
        for (y, row) in frame.data().chunks_exact(row_len).enumerate() {
            let start = y * stride;
            plane[start..start + row_len].copy_from_slice(row);
        }
        picture
    }

    /// Move every packet the encoder has ready into the container
    fn drain_packets(&mut self) -> DecimateResult<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            self.bytes_written += packet.size() as u64;
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| self.sink_error(format!("failed to write packet: {}", e)))?;
        }
        Ok(())
    }
}

impl FrameSink for LibavFrameSink {
    fn write_frame(&mut self, frame: Frame) -> DecimateResult<()> {
        if self.finished {
            return Err(self.sink_error("sink already finished"));
        }
        if frame.dimensions() != (self.width, self.height) || !frame.is_well_formed() {
            return Err(self.sink_error(format!(
                "frame is {}x{}, output expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let source_pixel = Self::source_pixel(frame.layout());
        let stale = self
            .scaler
            .as_ref()
            .map_or(true, |(_, current)| *current != source_pixel);
        if stale {
            let context = ScalingContext::get(
                source_pixel,
                self.width,
                self.height,
                self.pixel,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|e| self.sink_error(format!("cannot convert to {:?}: {}", self.pixel, e)))?;
            self.scaler = Some((context, source_pixel));
        }

        let index = self.next_pts as u64;
        let picture = Self::to_picture(&frame, source_pixel);
        let mut converted = ffmpeg::frame::Video::empty();
        if let Some((scaler, _)) = self.scaler.as_mut() {
            scaler
                .run(&picture, &mut converted)
                .map_err(|e| DecimateError::Sink {
                    index,
                    message: format!("pixel conversion failed: {}", e),
                })?;
        }
        converted.set_pts(Some(self.next_pts));

        self.encoder
            .send_frame(&converted)
            .map_err(|e| self.sink_error(format!("encoder rejected frame: {}", e)))?;
        self.next_pts += 1;

        self.drain_packets()
    }

    fn finish(&mut self) -> DecimateResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.encoder
            .send_eof()
            .map_err(|e| self.sink_error(format!("failed to flush encoder: {}", e)))?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .map_err(|e| self.sink_error(format!("failed to write trailer: {}", e)))?;

        debug!(
            "Encoder finished: {} frames, {:.2} MB",
            self.next_pts,
            self.bytes_written as f64 / 1024.0 / 1024.0
        );
        Ok(())
    }
}
