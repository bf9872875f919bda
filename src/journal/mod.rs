//! Event journal — readings in, capped log entries out.
//!
//! ```text
//!   Reading ──▶ same-second dedup ──▶ DuplicateFilter ──▶ cap ──▶ LogSink
//! ```
//!
//! Suppressed readings are still stored, flagged `is_suppressed`, so the
//! cap counts them.  Only visible entries are numbered and exported.

pub mod entry;
pub mod filter;

use chrono::NaiveDateTime;
use log::debug;

use crate::app::ports::LogSink;
use crate::config::JournalConfig;
use crate::error::StorageError;
use crate::protocol::{Reading, VoltageLevel};

pub use entry::{ExportDocument, LogEntry};
pub use filter::DuplicateFilter;

/// What happened to a recorded reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Logged(LogEntry),
    Suppressed(LogEntry),
    /// Same voltage already recorded within this second; nothing stored.
    SameSecond,
}

/// Journal manager wrapping a [`LogSink`].
pub struct Journal<S: LogSink> {
    sink: S,
    filter: DuplicateFilter,
    /// `(voltage, epoch second)` of the last recorded reading.
    last_recorded: Option<(VoltageLevel, i64)>,
    config: JournalConfig,
}

impl<S: LogSink> Journal<S> {
    pub fn new(sink: S, config: JournalConfig) -> Self {
        Self {
            sink,
            filter: DuplicateFilter::new(),
            last_recorded: None,
            config,
        }
    }

    /// Run `reading` through dedup and the duplicate filter, then store it.
    pub fn record(&mut self, reading: &Reading) -> Result<RecordOutcome, StorageError> {
        let voltage = reading.voltage();
        let second = reading.timestamp().and_utc().timestamp();

        if self.config.dedup_same_second && self.last_recorded == Some((voltage, second)) {
            debug!("journal: {} repeated within second {}, skipped", voltage, second);
            return Ok(RecordOutcome::SameSecond);
        }
        self.last_recorded = Some((voltage, second));

        let suppressed = !self.filter.should_log(voltage);
        let entry = LogEntry {
            sequence_number: reading.sequence_number(),
            timestamp: reading.timestamp(),
            voltage_display: voltage.display().to_string(),
            is_suppressed: suppressed,
        };

        if self.sink.count()? >= self.config.max_entries {
            self.sink.delete_oldest()?;
        }
        self.sink.insert(entry.clone())?;

        Ok(if suppressed {
            RecordOutcome::Suppressed(entry)
        } else {
            RecordOutcome::Logged(entry)
        })
    }

    /// Visible entries rendered newest first; the newest carries the
    /// highest number.
    pub fn visible_lines(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.sink.query_visible()?;
        let total = entries.len();
        Ok(entries
            .iter()
            .enumerate()
            .map(|(index, e)| e.format_line(total - index))
            .collect())
    }

    /// Build the export document, or `None` when there is nothing to export.
    pub fn export(
        &self,
        debug_lines: &[String],
        now: NaiveDateTime,
    ) -> Result<Option<ExportDocument>, StorageError> {
        let lines = self.visible_lines()?;
        Ok(ExportDocument::build(&lines, debug_lines, now))
    }

    /// Forget streak and same-second state so the next reading logs fresh.
    pub fn reset_duplicate_filter(&mut self) {
        self.filter.reset();
        self.last_recorded = None;
    }

    /// Wipe stored entries and filter state.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.sink.clear_all()?;
        self.filter.reset();
        Ok(())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
