//! Reading timeout tracker.
//!
//! Single-shot, restartable countdown.  Every accepted reading re-arms it;
//! if it lapses the owner clears the current reading exactly once until
//! the next reading arrives.

/// Countdown over monotonic milliseconds.
#[derive(Debug, Clone)]
pub struct ReadingTimeout {
    duration_ms: u64,
    deadline: Option<u64>,
}

impl ReadingTimeout {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            deadline: None,
        }
    }

    /// Cancel any pending countdown and start a new one from `now_ms`.
    pub fn arm(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.duration_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` exactly once when the countdown has lapsed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(d) if now_ms >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}
