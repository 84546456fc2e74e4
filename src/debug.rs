// src/debug.rs
// Wall-clock timing of store operations. Slow ones surface at warn level.

use std::time::{Duration, Instant};

/// Operations slower than this are reported as slow; mostly lock waits on a busy database.
pub const SLOW_OPERATION: Duration = Duration::from_millis(250);

/// Times an operation from creation until drop and logs the result.
pub struct OpTimer {
    label: String,
    started: Instant,
    slow_after: Duration,
}

impl OpTimer {
    pub fn start(label: impl Into<String>) -> Self {
        Self::with_threshold(label, SLOW_OPERATION)
    }

    pub fn with_threshold(label: impl Into<String>, slow_after: Duration) -> Self {
        OpTimer {
            label: label.into(),
            started: Instant::now(),
            slow_after,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_slow(&self) -> bool {
        self.elapsed() >= self.slow_after
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        if elapsed >= self.slow_after {
            log::warn!("{} took {:.2?} (slow, over {:?})", self.label, elapsed, self.slow_after);
        } else {
            log::trace!("{}: {:.2?}", self.label, elapsed);
        }
    }
}
