//! Duplicate suppression filter.
//!
//! Keeps the last [`WINDOW`] voltages in arrival order.  A reading is
//! logged unless the newest [`STREAK_LIMIT`] values (including itself)
//! are all the same:
//!
//! ```text
//!   154 154 154 154 154 220 154
//!    ✓   ✓   ✓   ✗   ✗   ✓   ✓
//! ```

use heapless::Deque;

use crate::protocol::VoltageLevel;

/// History length.
pub const WINDOW: usize = 10;

/// The Nth identical value in a row is the first one suppressed.
pub const STREAK_LIMIT: usize = 4;

/// Sliding-window duplicate filter.  Callers serialise access.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    history: Deque<VoltageLevel, WINDOW>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voltage` and decide whether it should be logged.
    pub fn should_log(&mut self, voltage: VoltageLevel) -> bool {
        if self.history.is_full() {
            self.history.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.history.push_back(voltage);

        if self.history.len() < STREAK_LIMIT {
            return true;
        }
        !self
            .history
            .iter()
            .rev()
            .take(STREAK_LIMIT)
            .all(|&v| v == voltage)
    }

    /// Forget all history; the next readings always log.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
