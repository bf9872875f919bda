//! Journal records and their text rendering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// `yyyy/MM/dd HH:mm:ss`
pub const LINE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Export file stamp, `yyyyMMdd_HHmmss`.
pub const FILE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One journal record.  Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Packet sequence number of the reading that produced the entry.
    pub sequence_number: u16,
    pub timestamp: NaiveDateTime,
    pub voltage_display: String,
    /// Stored but hidden from the visible list.
    pub is_suppressed: bool,
}

impl LogEntry {
    /// `"<n>. <yyyy/MM/dd HH:mm:ss> <voltage_display>"`
    pub fn format_line(&self, n: usize) -> String {
        format!(
            "{}. {} {}",
            n,
            self.timestamp.format(LINE_TIME_FORMAT),
            self.voltage_display
        )
    }
}

/// A rendered export, ready to be written by a file adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub contents: String,
}

impl ExportDocument {
    /// Build the document from formatted event lines and optional link
    /// debug lines.  Returns `None` when both are empty.
    pub fn build(lines: &[String], debug: &[String], now: NaiveDateTime) -> Option<Self> {
        if lines.is_empty() && debug.is_empty() {
            return None;
        }

        let mut contents = String::new();
        if !lines.is_empty() {
            contents.push_str("=== Event Log ===\n");
            for line in lines {
                contents.push_str(line);
                contents.push('\n');
            }
        }
        if !debug.is_empty() {
            contents.push('\n');
            contents.push_str("=== Link Debug Log ===\n");
            for line in debug {
                contents.push_str(line);
                contents.push('\n');
            }
        }

        Some(Self {
            file_name: format!("HVPA#{}.log", now.format(FILE_TIME_FORMAT)),
            contents,
        })
    }
}
