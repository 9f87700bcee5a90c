//! Frame source backed by libav demuxing and decoding
//!
//! Decodes the best video stream of a file and hands out BGR24 frames one at
//! a time. Packet read failures and decoder rejections are reported as
//! stream errors, distinct from the end of the stream.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use tracing::{debug, info, warn};

use crate::domain::model::{Frame, FrameRate, PixelLayout, StreamInfo};
use crate::error::{DecimateError, DecimateResult};
use crate::ports::FrameSource;

/// Frame rate assumed when the container declares none
const FALLBACK_FRAME_RATE: (i32, i32) = (25, 1);

/// Decoding frame source
pub struct LibavFrameSource {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::codec::decoder::Video,
    stream_index: usize,
    scaler: Option<(ScalingContext, (ffmpeg::format::Pixel, u32, u32))>,
    info: StreamInfo,
    position: u64,
    draining: bool,
    finished: bool,
}

impl LibavFrameSource {
    /// Open `path` and probe its best video stream
    pub fn open(path: &Path) -> DecimateResult<Self> {
        if !path.exists() {
            return Err(DecimateError::InputNotFound {
                path: path.display().to_string(),
            });
        }

        crate::init()?;

        let input = ffmpeg::format::input(&path)?;

        let (stream_index, mut context, frame_rate, frame_count, codec) = {
            let stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| DecimateError::Stream {
                    index: 0,
                    message: format!("no video stream in {}", path.display()),
                })?;

            let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
            let frame_rate = Self::declared_frame_rate(stream.avg_frame_rate())
                .or_else(|| Self::declared_frame_rate(stream.rate()));
            let frame_count = u64::try_from(stream.frames()).ok().filter(|n| *n > 0);
            let codec = stream.parameters().id().name().to_string();

            (stream.index(), context, frame_rate, frame_count, codec)
        };

        context.set_threading(ffmpeg::codec::threading::Config {
            kind: ffmpeg::codec::threading::Type::Frame,
            count: num_cpus::get(),
            ..Default::default()
        });

        let decoder = context.decoder().video()?;

        let frame_rate = match frame_rate {
            Some(rate) => rate,
            None => {
                warn!(
                    "{} declares no frame rate, assuming {}/{}",
                    path.display(),
                    FALLBACK_FRAME_RATE.0,
                    FALLBACK_FRAME_RATE.1
                );
                FrameRate::new(FALLBACK_FRAME_RATE.0, FALLBACK_FRAME_RATE.1)?
            }
        };

        let duration_seconds = (input.duration() > 0)
            .then(|| input.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE));

        let info = StreamInfo {
            width: decoder.width(),
            height: decoder.height(),
            frame_rate,
            frame_count,
            codec,
            duration_seconds,
        };

        info!(
            "Opened {}: {}x{} {} @ {}, {} frames",
            path.display(),
            info.width,
            info.height,
            info.codec,
            info.frame_rate,
            info.frame_count
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            scaler: None,
            info,
            position: 0,
            draining: false,
            finished: false,
        })
    }

    fn declared_frame_rate(rate: ffmpeg::Rational) -> Option<FrameRate> {
        FrameRate::new(rate.numerator(), rate.denominator()).ok()
    }

    fn stream_error(&self, message: String) -> DecimateError {
        DecimateError::Stream {
            index: self.position,
            message,
        }
    }

    /// Send the next packet of the video stream, or EOF once the file is exhausted
    fn feed_decoder(&mut self) -> DecimateResult<()> {
        if self.draining {
            // Decoder wants input after EOF was signalled; nothing left to give.
            self.finished = true;
            return Ok(());
        }

        loop {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    return self
                        .decoder
                        .send_packet(&packet)
                        .map_err(|e| self.stream_error(format!("decoder rejected packet: {}", e)));
                }
                Err(ffmpeg::Error::Eof) => {
                    debug!("End of input after {} frames, draining decoder", self.position);
                    self.draining = true;
                    return self
                        .decoder
                        .send_eof()
                        .map_err(|e| self.stream_error(format!("failed to flush decoder: {}", e)));
                }
                Err(e) => {
                    return Err(self.stream_error(format!("corrupt packet: {}", e)));
                }
            }
        }
    }

    /// Convert a decoded picture to a packed BGR24 frame
    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> DecimateResult<Frame> {
        let key = (decoded.format(), decoded.width(), decoded.height());
        let (width, height) = (key.1, key.2);

        let stale = self.scaler.as_ref().map_or(true, |(_, current)| *current != key);
        if stale {
            let context = ScalingContext::get(
                key.0,
                width,
                height,
                ffmpeg::format::Pixel::BGR24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|e| DecimateError::Decode {
                index: self.position,
                message: format!("cannot convert {:?} {}x{}: {}", key.0, width, height, e),
            })?;
            self.scaler = Some((context, key));
        }

        let index = self.position;
        let mut bgr = ffmpeg::frame::Video::empty();
        if let Some((scaler, _)) = self.scaler.as_mut() {
            scaler.run(decoded, &mut bgr).map_err(|e| DecimateError::Decode {
                index,
                message: format!("pixel conversion failed: {}", e),
            })?;
        }

        let row_len = width as usize * PixelLayout::Bgr24.bytes_per_pixel();
        let stride = bgr.stride(0);
        let plane = bgr.data(0);
        let mut data = Vec::with_capacity(row_len * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            data.extend_from_slice(&plane[start..start + row_len]);
        }

        Ok(Frame::new(width, height, PixelLayout::Bgr24, data))
    }
}

impl FrameSource for LibavFrameSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> DecimateResult<Option<Frame>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let mut decoded = ffmpeg::frame::Video::empty();
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    let frame = self.convert(&decoded)?;
                    self.position += 1;
                    return Ok(Some(frame));
                }
                Err(ffmpeg::Error::Eof) => {
                    self.finished = true;
                    return Ok(None);
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {
                    self.feed_decoder()?;
                }
                Err(e) => {
                    return Err(self.stream_error(format!("decoding failed: {}", e)));
                }
            }
        }
    }
}
