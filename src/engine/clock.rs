// src/engine/clock.rs

use std::time::{Duration, Instant};

/// Monotonic clock measuring offsets from the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Time elapsed since the clock was created.
    pub fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Start and end of a successful task body, relative to the run clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timing {
    pub start: Duration,
    pub end: Duration,
}

impl Timing {
    pub fn elapsed(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}
