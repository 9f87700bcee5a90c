//! Progress tracking and callback system for the decimation loop

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

/// Progress callback trait
pub trait ProgressCallback: Send + Sync {
    /// Called when the stream starts
    fn on_start(&self, operation: &str, total_frames: Option<u64>);

    /// Called with the frames read and kept so far
    fn on_progress(&self, progress: &ProgressInfo);

    /// Called when the stream completes successfully
    fn on_complete(&self, progress: &ProgressInfo);

    /// Called when processing fails
    fn on_error(&self, error: &str);

    /// Called when processing is cancelled
    fn on_cancel(&self);

    /// Check if processing should stop before the next frame
    fn should_cancel(&self) -> bool;
}

/// Snapshot of progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Current phase
    pub phase: ProgressPhase,
    /// Progress percentage (0.0 - 100.0), when the total is known
    pub percent: Option<f64>,
    /// Frames pulled from the source
    pub frames_read: u64,
    /// Frames forwarded to the sink
    pub frames_written: u64,
    /// Total frames declared by the source
    pub total: Option<u64>,
    /// Time elapsed since start
    pub elapsed: Duration,
    /// Estimated time remaining
    pub eta: Option<Duration>,
    /// Frames read per second
    pub throughput: Option<f64>,
}

/// Progress phases
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProgressPhase {
    Initializing,
    Processing,
    Complete,
    Failed,
    Cancelled,
}

/// Progress tracker shared between the pipeline and its observers
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressTrackerInner>>,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
}

struct ProgressTrackerInner {
    info: ProgressInfo,
    start_time: Instant,
    last_update: Option<Instant>,
    cancelled: bool,
    update_interval: Duration,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let info = ProgressInfo {
            phase: ProgressPhase::Initializing,
            percent: None,
            frames_read: 0,
            frames_written: 0,
            total: None,
            elapsed: Duration::ZERO,
            eta: None,
            throughput: None,
        };

        let inner = ProgressTrackerInner {
            info,
            start_time: Instant::now(),
            last_update: None,
            cancelled: false,
            update_interval: Duration::from_millis(500),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a progress callback
    pub fn add_callback(&self, callback: Arc<dyn ProgressCallback>) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(callback);
        }
    }

    /// Set the minimum time between progress notifications
    pub fn set_update_interval(&self, interval: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.update_interval = interval;
        }
    }

    /// Start a stream with an optional total frame count
    pub fn start(&self, operation: &str, total_frames: Option<u64>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.info.phase = ProgressPhase::Processing;
            inner.info.total = total_frames.filter(|t| *t > 0);
            inner.info.frames_read = 0;
            inner.info.frames_written = 0;
            inner.start_time = Instant::now();
            inner.last_update = None;
        }

        self.notify_callbacks(|cb| cb.on_start(operation, total_frames));
    }

    /// Record counters; callbacks fire at most once per update interval
    pub fn update(&self, frames_read: u64, frames_written: u64) {
        let snapshot = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            let now = Instant::now();
            inner.info.frames_read = frames_read;
            inner.info.frames_written = frames_written;
            inner.info.elapsed = now.duration_since(inner.start_time);

            let due = inner
                .last_update
                .map_or(true, |last| now.duration_since(last) >= inner.update_interval);
            if !due {
                return;
            }
            inner.last_update = Some(now);
            Self::refresh_estimates(&mut inner.info);
            inner.info.clone()
        };

        self.notify_callbacks(|cb| cb.on_progress(&snapshot));
    }

    fn refresh_estimates(info: &mut ProgressInfo) {
        let secs = info.elapsed.as_secs_f64();
        info.throughput = (secs > 0.0).then(|| info.frames_read as f64 / secs);

        if let Some(total) = info.total {
            info.percent = Some((info.frames_read as f64 / total as f64 * 100.0).min(100.0));
            info.eta = match info.throughput {
                Some(rate) if rate > 0.0 && info.frames_read < total => Some(
                    Duration::from_secs_f64((total - info.frames_read) as f64 / rate),
                ),
                _ => None,
            };
        }
    }

    /// Complete the stream successfully
    pub fn complete(&self) {
        let snapshot = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            inner.info.phase = ProgressPhase::Complete;
            // A request that arrived after the last frame has nothing left to stop.
            inner.cancelled = false;
            inner.info.elapsed = inner.start_time.elapsed();
            Self::refresh_estimates(&mut inner.info);
            inner.info.percent = Some(100.0);
            inner.info.eta = None;
            inner.info.clone()
        };

        self.notify_callbacks(|cb| cb.on_complete(&snapshot));
    }

    /// Mark the stream as failed
    pub fn error(&self, error: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.info.phase = ProgressPhase::Failed;
            inner.cancelled = false;
        }

        self.notify_callbacks(|cb| cb.on_error(error));
    }

    /// Request cancellation; honored before the next frame
    pub fn cancel(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.cancelled = true;
            inner.info.phase = ProgressPhase::Cancelled;
        }

        self.notify_callbacks(|cb| cb.on_cancel());
    }

    /// Check if processing should stop
    pub fn is_cancelled(&self) -> bool {
        if let Ok(inner) = self.inner.lock() {
            if inner.cancelled {
                return true;
            }
        }

        if let Ok(callbacks) = self.callbacks.lock() {
            return callbacks.iter().any(|callback| callback.should_cancel());
        }

        false
    }

    /// Consume a pending cancellation request, from [`cancel`](Self::cancel)
    /// or from a callback.
    ///
    /// Returns `true` when processing should stop. The request is cleared,
    /// so the same tracker can drive a later run.
    pub fn take_cancellation(&self) -> bool {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.cancelled {
                inner.cancelled = false;
                return true;
            }
        }

        let from_callback = self
            .callbacks
            .lock()
            .map(|callbacks| callbacks.iter().any(|callback| callback.should_cancel()))
            .unwrap_or(false);
        if from_callback {
            if let Ok(mut inner) = self.inner.lock() {
                inner.info.phase = ProgressPhase::Cancelled;
            }
            self.notify_callbacks(|cb| cb.on_cancel());
        }
        from_callback
    }

    /// Get current progress information
    pub fn get_info(&self) -> Option<ProgressInfo> {
        self.inner.lock().ok().map(|inner| inner.info.clone())
    }

    fn notify_callbacks<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.iter() {
                f(callback.as_ref());
            }
        }
    }
}

/// Progress callback that reports through `tracing`
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_start(&self, operation: &str, total_frames: Option<u64>) {
        match total_frames {
            Some(total) => info!("Starting: {} ({} frames)", operation, total),
            None => info!("Starting: {}", operation),
        }
    }

    fn on_progress(&self, progress: &ProgressInfo) {
        let dropped = progress.frames_read - progress.frames_written;
        match (progress.percent, progress.eta) {
            (Some(percent), Some(eta)) => info!(
                "[{:>5.1}%] {} frames read, {} dropped (ETA: {:.0}s)",
                percent,
                progress.frames_read,
                dropped,
                eta.as_secs_f64()
            ),
            (Some(percent), None) => info!(
                "[{:>5.1}%] {} frames read, {} dropped",
                percent, progress.frames_read, dropped
            ),
            _ => info!("{} frames read, {} dropped", progress.frames_read, dropped),
        }
    }

    fn on_complete(&self, progress: &ProgressInfo) {
        info!(
            "Processed {} frames in {:.2}s",
            progress.frames_read,
            progress.elapsed.as_secs_f64()
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Processing failed: {}", error);
    }

    fn on_cancel(&self) {
        tracing::warn!("Processing cancelled");
    }

    fn should_cancel(&self) -> bool {
        false
    }
}

/// JSON progress callback for structured output on stdout
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str, total_frames: Option<u64>) {
        let event = serde_json::json!({
            "event": "start",
            "operation": operation,
            "total_frames": total_frames,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_progress(&self, progress: &ProgressInfo) {
        let event = serde_json::json!({
            "event": "progress",
            "frames_read": progress.frames_read,
            "frames_written": progress.frames_written,
            "total_frames": progress.total,
            "percent": progress.percent,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_complete(&self, progress: &ProgressInfo) {
        let event = serde_json::json!({
            "event": "complete",
            "frames_read": progress.frames_read,
            "frames_written": progress.frames_written,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_error(&self, error: &str) {
        let event = serde_json::json!({
            "event": "error",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_cancel(&self) {
        let event = serde_json::json!({
            "event": "cancel",
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn should_cancel(&self) -> bool {
        false
    }
}
