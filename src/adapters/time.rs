//! Host clock adapter.
//!
//! Monotonic milliseconds come from `std::time::Instant` so deadlines are
//! immune to wall-clock jumps; the wall part is `chrono::Local` and only
//! stamps readings and exports.

use std::time::Instant;

use chrono::Local;

use crate::app::ports::{Clock, Moment};

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since construction.
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment {
            mono_ms: self.uptime_ms(),
            wall: Local::now().naive_local(),
        }
    }
}
