//! Decimation engine: drives the gate over a frame source

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::model::{Decision, FrameKey, RetentionLimit};
use crate::domain::rules::RunLengthGate;
use crate::error::{DecimateError, DecimateResult};
use crate::ports::{FrameSink, FrameSource};

pub mod comparator;
pub mod progress;

pub use comparator::{FrameComparator, KeyMode};
pub use progress::{ProgressCallback, ProgressTracker};

/// Outcome of one decimation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Frames pulled from the source
    pub frames_read: u64,
    /// Frames forwarded to the sink
    pub frames_written: u64,
    /// Frames dropped by the gate
    pub frames_dropped: u64,
    /// Number of maximal runs of equal frames
    pub runs: u64,
    /// Length of the longest run seen
    pub longest_run: u64,
    /// Runs longer than the retention limit
    pub truncated_runs: u64,
    /// Retention limit used
    pub retention_limit: u32,
    /// Comparison representation used
    pub key_mode: KeyMode,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Processing time in milliseconds
    pub elapsed_ms: u64,
}

impl PipelineReport {
    /// Share of input frames dropped, in percent
    pub fn drop_ratio(&self) -> f64 {
        if self.frames_read == 0 {
            0.0
        } else {
            self.frames_dropped as f64 / self.frames_read as f64 * 100.0
        }
    }
}

/// Run statistics collected alongside the gate
#[derive(Debug, Default)]
struct RunStats {
    runs: u64,
    longest_run: u64,
    truncated_runs: u64,
}

impl RunStats {
    fn record(&mut self, count: u64, limit: u64) {
        if count == 1 {
            self.runs += 1;
        }
        self.longest_run = self.longest_run.max(count);
        if count == limit + 1 {
            self.truncated_runs += 1;
        }
    }
}

/// Sequential keep/drop pipeline over one stream at a time
pub struct DecimationPipeline {
    comparator: FrameComparator,
    limit: RetentionLimit,
    progress: Option<ProgressTracker>,
}

impl DecimationPipeline {
    /// Create a pipeline with the given retention limit and luma comparison
    pub fn new(limit: RetentionLimit) -> Self {
        Self {
            comparator: FrameComparator::default(),
            limit,
            progress: None,
        }
    }

    /// Use a specific comparator
    pub fn with_comparator(mut self, comparator: FrameComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Report progress and honor cancellation through `tracker`
    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.progress = Some(tracker);
        self
    }

    pub fn limit(&self) -> RetentionLimit {
        self.limit
    }

    /// Drive `source` to completion, forwarding kept frames to `sink`.
    ///
    /// Every run gets a fresh gate. Frames already written when an error
    /// occurs stay written; the sink is only finished on success.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> DecimateResult<PipelineReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let started_at = Utc::now();
        let timer = Instant::now();
        let total = source.info().frame_count;

        if let Some(tracker) = &self.progress {
            tracker.start("Removing repeated frames", total);
        }

        let result = self.drive(source, sink);

        match result {
            Ok((frames_read, frames_written, stats)) => {
                if let Some(tracker) = &self.progress {
                    tracker.update(frames_read, frames_written);
                    tracker.complete();
                }
                if frames_read == 0 {
                    warn!("Source produced no frames");
                }

                let report = PipelineReport {
                    frames_read,
                    frames_written,
                    frames_dropped: frames_read - frames_written,
                    runs: stats.runs,
                    longest_run: stats.longest_run,
                    truncated_runs: stats.truncated_runs,
                    retention_limit: self.limit.get(),
                    key_mode: self.comparator.mode(),
                    started_at,
                    elapsed_ms: timer.elapsed().as_millis() as u64,
                };
                info!(
                    "Kept {} of {} frames ({} dropped, {:.1}%)",
                    report.frames_written,
                    report.frames_read,
                    report.frames_dropped,
                    report.drop_ratio()
                );
                Ok(report)
            }
            Err(e) => {
                if let Some(tracker) = &self.progress {
                    if !matches!(e, DecimateError::Cancelled { .. }) {
                        tracker.error(&e.to_string());
                    }
                }
                Err(e)
            }
        }
    }

    fn drive<S, K>(&self, source: &mut S, sink: &mut K) -> DecimateResult<(u64, u64, RunStats)>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let declared = (source.info().width, source.info().height);
        let mut gate: RunLengthGate<FrameKey> = RunLengthGate::new(self.limit);
        let mut stats = RunStats::default();
        let mut shape: Option<(u32, u32)> = None;
        let mut frames_read: u64 = 0;
        let mut frames_written: u64 = 0;
        let limit = u64::from(self.limit.get());

        loop {
            if let Some(tracker) = &self.progress {
                if tracker.take_cancellation() {
                    return Err(DecimateError::Cancelled { index: frames_read });
                }
            }

            let index = frames_read;
            let Some(frame) = source.next_frame()? else {
                break;
            };
            frames_read += 1;

            let dimensions = frame.dimensions();
            match shape {
                None => shape = Some(dimensions),
                Some(expected) if expected != dimensions => {
                    return Err(DecimateError::Stream {
                        index,
                        message: format!(
                            "frame is {}x{}, stream started at {}x{}",
                            dimensions.0, dimensions.1, expected.0, expected.1
                        ),
                    });
                }
                Some(_) => {}
            }
            self.comparator.check_declared_shape(&frame, declared, index)?;

            let key = self.comparator.derive_key(&frame, index)?;
            let comparator = self.comparator;
            let decision = gate.step_with(key, |a, b| comparator.equal(a, b));
            let count = gate.consecutive_count();
            stats.record(count, limit);

            match decision {
                Decision::Keep => {
                    sink.write_frame(frame).map_err(|e| sink_error(e, index))?;
                    frames_written += 1;
                }
                Decision::Drop => {
                    if count == limit + 1 {
                        debug!("Frame {}: run exceeds {} repeats, dropping tail", index, limit);
                    }
                }
            }

            if let Some(tracker) = &self.progress {
                tracker.update(frames_read, frames_written);
            }
        }

        sink.finish().map_err(|e| sink_error(e, frames_read))?;
        Ok((frames_read, frames_written, stats))
    }
}

/// Attach the stream position to whatever the sink reported
fn sink_error(error: DecimateError, index: u64) -> DecimateError {
    match error {
        DecimateError::Sink { message, .. } => DecimateError::Sink { index, message },
        other => DecimateError::Sink {
            index,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Frame, FrameRate, StreamInfo};
    use crate::ports::{VecSink, VecSource};

    fn info() -> StreamInfo {
        StreamInfo::new(2, 2, FrameRate::new(25, 1).unwrap())
    }

    fn gray(value: u8) -> Frame {
        Frame::solid_bgr(2, 2, [value, value, value])
    }

    #[test]
    fn test_run_stats() {
        let pipeline = DecimationPipeline::new(RetentionLimit::new(2).unwrap());
        let frames = [1, 1, 1, 1, 2, 3, 3, 3].iter().map(|v| gray(*v)).collect();
        let mut source = VecSource::new(info(), frames);
        let mut sink = VecSink::new();

        let report = pipeline.run(&mut source, &mut sink).unwrap();
        assert_eq!(report.frames_read, 8);
        assert_eq!(report.frames_written, 5);
        assert_eq!(report.frames_dropped, 3);
        assert_eq!(report.runs, 3);
        assert_eq!(report.longest_run, 4);
        assert_eq!(report.truncated_runs, 2);
        assert_eq!(report.retention_limit, 2);
        assert!((report.drop_ratio() - 37.5).abs() < f64::EPSILON);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_sink_error_carries_stream_position() {
        let pipeline = DecimationPipeline::new(RetentionLimit::new(1).unwrap());
        let frames = [1, 1, 2, 3].iter().map(|v| gray(*v)).collect();
        let mut source = VecSource::new(info(), frames);
        let mut sink = VecSink::with_capacity_limit(2);

        match pipeline.run(&mut source, &mut sink) {
            Err(DecimateError::Sink { index, .. }) => assert_eq!(index, 3),
            other => panic!("expected sink error, got {:?}", other),
        }
        assert_eq!(sink.frames().len(), 2);
        assert!(!sink.is_finished());
    }

    #[test]
    fn test_cancellation_between_frames() {
        let tracker = ProgressTracker::new();
        tracker.cancel();
        let pipeline = DecimationPipeline::new(RetentionLimit::default()).with_progress(tracker);
        let mut source = VecSource::new(info(), vec![gray(1), gray(2)]);
        let mut sink = VecSink::new();

        match pipeline.run(&mut source, &mut sink) {
            Err(DecimateError::Cancelled { index }) => assert_eq!(index, 0),
            other => panic!("expected cancellation, got {:?}", other),
        }
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn test_tracker_reusable_after_cancellation() {
        let tracker = ProgressTracker::new();
        let pipeline = DecimationPipeline::new(RetentionLimit::default()).with_progress(tracker.clone());

        tracker.cancel();
        let mut source = VecSource::new(info(), vec![gray(1), gray(2)]);
        let mut sink = VecSink::new();
        assert!(matches!(
            pipeline.run(&mut source, &mut sink),
            Err(DecimateError::Cancelled { index: 0 })
        ));

        let mut source = VecSource::new(info(), vec![gray(1), gray(2)]);
        let mut sink = VecSink::new();
        let report = pipeline.run(&mut source, &mut sink).unwrap();
        assert_eq!(report.frames_written, 2);
        assert!(!tracker.is_cancelled());
    }
}
