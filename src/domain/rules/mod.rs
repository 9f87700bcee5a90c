// Domain rules - Run-length retention policy

use crate::domain::model::{Decision, RetentionLimit};

/// Per-stream state of the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState<K> {
    /// Length of the current run of equal frames, including the current one
    pub consecutive_count: u64,
    /// Key of the immediately preceding frame, absent at stream start
    pub previous_key: Option<K>,
}

impl<K> Default for RunState<K> {
    fn default() -> Self {
        Self {
            consecutive_count: 0,
            previous_key: None,
        }
    }
}

/// Keeps the first `n` frames of every run of equal frames and drops the rest.
///
/// Runs separated by a single differing frame are independent: the count
/// resets to 1 on any inequality. The first frame of a stream is always kept.
#[derive(Debug, Clone)]
pub struct RunLengthGate<K> {
    limit: RetentionLimit,
    state: RunState<K>,
}

impl<K: PartialEq> RunLengthGate<K> {
    /// Create a gate for a new stream
    pub fn new(limit: RetentionLimit) -> Self {
        Self {
            limit,
            state: RunState::default(),
        }
    }

    /// Feed the key of the next frame and get its decision
    pub fn step(&mut self, key: K) -> Decision {
        let decision = match self.state.previous_key.as_ref() {
            None => self.start(),
            Some(previous) => {
                let repeated = *previous == key;
                self.advance(repeated)
            }
        };
        self.state.previous_key = Some(key);
        decision
    }

    /// Same as [`step`](Self::step) with a caller-supplied equality verdict
    pub fn step_with<F>(&mut self, key: K, equal: F) -> Decision
    where
        F: FnOnce(&K, &K) -> bool,
    {
        let decision = match self.state.previous_key.as_ref() {
            None => self.start(),
            Some(previous) => {
                let repeated = equal(previous, &key);
                self.advance(repeated)
            }
        };
        self.state.previous_key = Some(key);
        decision
    }
}

impl<K> RunLengthGate<K> {
    /// First frame of the stream, kept unconditionally
    fn start(&mut self) -> Decision {
        self.state.consecutive_count = 1;
        Decision::Keep
    }

    /// Counter transition for one frame after the first, driven by an
    /// equality verdict alone.
    ///
    /// Does not record a key. A later [`step`](Self::step) on the same gate
    /// has nothing to compare against and starts a new run.
    pub(crate) fn advance(&mut self, repeated: bool) -> Decision {
        if repeated && self.state.consecutive_count > 0 {
            self.state.consecutive_count = self.state.consecutive_count.saturating_add(1);
        } else {
            self.state.consecutive_count = 1;
        }

        if self.state.consecutive_count <= u64::from(self.limit.get()) {
            Decision::Keep
        } else {
            Decision::Drop
        }
    }

    /// Length of the current run
    pub fn consecutive_count(&self) -> u64 {
        self.state.consecutive_count
    }

    pub fn limit(&self) -> RetentionLimit {
        self.limit
    }

    pub fn state(&self) -> &RunState<K> {
        &self.state
    }

    /// Whether any frame has been observed yet
    pub fn has_started(&self) -> bool {
        self.state.consecutive_count > 0
    }
}
