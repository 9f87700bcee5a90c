// Ports - Interface definitions (contracts)

use std::collections::VecDeque;

use crate::domain::model::{Frame, StreamInfo};
use crate::error::{DecimateError, DecimateResult};

/// Port for an ordered, finite, forward-only sequence of frames
pub trait FrameSource {
    /// Stream metadata, available before the first frame is pulled
    fn info(&self) -> &StreamInfo;

    /// Pull the next frame.
    ///
    /// `Ok(None)` marks the end of the stream. A corrupt or undecodable unit
    /// is reported as [`DecimateError::Stream`], never as end of stream.
    fn next_frame(&mut self) -> DecimateResult<Option<Frame>>;
}

/// Port for the destination of kept frames
pub trait FrameSink {
    /// Persist one frame; frames arrive in stream order
    fn write_frame(&mut self, frame: Frame) -> DecimateResult<()>;

    /// Flush buffered output. Called once after the last frame.
    fn finish(&mut self) -> DecimateResult<()> {
        Ok(())
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> &StreamInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> DecimateResult<Option<Frame>> {
        (**self).next_frame()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: Frame) -> DecimateResult<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> DecimateResult<()> {
        (**self).finish()
    }
}

/// In-memory source, optionally failing at a given position
pub struct VecSource {
    info: StreamInfo,
    frames: VecDeque<Frame>,
    position: u64,
    corrupt_at: Option<u64>,
}

impl VecSource {
    /// Create a source over the given frames
    pub fn new(info: StreamInfo, frames: Vec<Frame>) -> Self {
        Self {
            info,
            frames: frames.into(),
            position: 0,
            corrupt_at: None,
        }
    }

    /// Report a corrupt unit instead of the frame at `index`
    pub fn with_corruption_at(mut self, index: u64) -> Self {
        self.corrupt_at = Some(index);
        self
    }
}

impl FrameSource for VecSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> DecimateResult<Option<Frame>> {
        if self.corrupt_at == Some(self.position) {
            return Err(DecimateError::Stream {
                index: self.position,
                message: "corrupt unit in source".to_string(),
            });
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}

/// In-memory sink collecting every written frame
#[derive(Default)]
pub struct VecSink {
    frames: Vec<Frame>,
    capacity: Option<usize>,
    finished: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once `capacity` frames have been stored
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for VecSink {
    fn write_frame(&mut self, frame: Frame) -> DecimateResult<()> {
        if self.capacity.is_some_and(|cap| self.frames.len() >= cap) {
            return Err(DecimateError::Sink {
                index: self.frames.len() as u64,
                message: "sink capacity exhausted".to_string(),
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    fn finish(&mut self) -> DecimateResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Sink that only counts frames, used for dry runs
#[derive(Debug, Default)]
pub struct DiscardSink {
    written: u64,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for DiscardSink {
    fn write_frame(&mut self, _frame: Frame) -> DecimateResult<()> {
        self.written += 1;
        Ok(())
    }
}
