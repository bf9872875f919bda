//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured pipeline events to the
//! `log` facade (stderr via `env_logger` on the host binary).  A status
//! screen or telemetry uplink would implement the same trait.

use log::{info, warn};

use crate::app::events::PipelineEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`PipelineEvent`] as one line.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PipelineEvent) {
        self.emitted += 1;
        match event {
            PipelineEvent::ReadingAccepted(r) => {
                info!(
                    "READING | {} | seq={} | severity={:?} | at={} | raw={:02X?}",
                    r.voltage(),
                    r.sequence_number(),
                    r.voltage().severity(),
                    r.timestamp().format("%H:%M:%S%.3f"),
                    r.raw_bytes(),
                );
            }
            PipelineEvent::EntryLogged(e) => {
                info!(
                    "JOURNAL | {} | seq={}{}",
                    e.voltage_display,
                    e.sequence_number,
                    if e.is_suppressed { " | suppressed" } else { "" },
                );
            }
            PipelineEvent::AlertRaised(v) => {
                warn!("ALERT | raised | {}", v);
            }
            PipelineEvent::AlertUnavailable(v) => {
                warn!("ALERT | unavailable | {}", v);
            }
            PipelineEvent::AlertsStopped => {
                info!("ALERT | stopped");
            }
            PipelineEvent::ReadingLost => {
                info!("READING | lost");
            }
            PipelineEvent::LinkStateChanged(s) => {
                info!("LINK | {}", s);
            }
            PipelineEvent::CommandDropped(c) => {
                warn!("LINK | command dropped | {:?}", c);
            }
            PipelineEvent::StorageFailed(e) => {
                warn!("JOURNAL | storage failed | {}", e);
            }
        }
    }
}
