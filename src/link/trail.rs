//! Bounded link debug trail, appended to log exports.

use chrono::NaiveDateTime;
use heapless::HistoryBuffer;

/// Lines kept; older lines are overwritten.
pub const TRAIL_LINES: usize = 200;

pub struct DebugTrail {
    lines: HistoryBuffer<String, TRAIL_LINES>,
}

impl Default for DebugTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugTrail {
    pub fn new() -> Self {
        Self {
            lines: HistoryBuffer::new(),
        }
    }

    pub fn push(&mut self, at: NaiveDateTime, msg: impl core::fmt::Display) {
        self.lines
            .write(format!("{} {}", at.format("%H:%M:%S%.3f"), msg));
    }

    /// Oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.oldest_ordered().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
