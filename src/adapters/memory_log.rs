//! In-memory journal storage.
//!
//! Implements [`LogSink`] over a `Vec` in insertion order.  Used by the
//! host binary and tests; a database-backed sink would implement the same
//! trait.

use crate::app::ports::LogSink;
use crate::error::StorageError;
use crate::journal::LogEntry;

#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Vec<LogEntry>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry, oldest first, suppressed ones included.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

impl LogSink for MemoryLogSink {
    fn insert(&mut self, entry: LogEntry) -> Result<(), StorageError> {
        self.entries.push(entry);
        Ok(())
    }

    fn query_visible(&self) -> Result<Vec<LogEntry>, StorageError> {
        Ok(self
            .entries
            .iter()
            .rev()
            .filter(|e| !e.is_suppressed)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.entries.len())
    }

    fn delete_oldest(&mut self) -> Result<(), StorageError> {
        if self.entries.is_empty() {
            return Err(StorageError::NotFound);
        }
        self.entries.remove(0);
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}
