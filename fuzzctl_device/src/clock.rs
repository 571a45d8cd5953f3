//! Injectable clock.
//!
//! The monitor loop needs to sleep between process-table polls; tests need
//! to advance time without sleeping. Both go through this trait.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Suspend the calling thread for `d`.
    fn sleep(&self, d: Duration);
}

/// Wall-clock implementation.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}
