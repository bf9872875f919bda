//! Outbound pipeline events.
//!
//! The [`Pipeline`](super::service::Pipeline) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log lines, a status screen, a
//! telemetry uplink.

use super::commands::AppCommand;
use crate::error::StorageError;
use crate::journal::LogEntry;
use crate::link::ConnectionState;
use crate::protocol::{Reading, VoltageLevel};

/// Structured events emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A decoded reading reached the pipeline.
    ReadingAccepted(Reading),

    /// The journal stored an entry (visible or suppressed).
    EntryLogged(LogEntry),

    /// Alert channels were started for this level.
    AlertRaised(VoltageLevel),

    /// A dangerous level was seen but no output channel could start.
    AlertUnavailable(VoltageLevel),

    /// Every alert channel was stopped.
    AlertsStopped,

    /// The current reading expired or the link went down.
    ReadingLost,

    LinkStateChanged(ConnectionState),

    /// A link command could not be queued for the connection manager.
    CommandDropped(AppCommand),

    /// The log sink refused an operation; the reading was not stored.
    StorageFailed(StorageError),
}
