//! Port traits — the hexagonal boundary between the pipeline and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Pipeline / ConnectionManager (domain)
//! ```
//!
//! Driven adapters (radio transport, log storage, key-value storage, clocks,
//! alert outputs, event sinks) implement these traits.  The domain consumes
//! them via generics or trait objects, so the core never touches a radio,
//! a speaker, or a database directly.

use chrono::NaiveDateTime;

use crate::alert::ChannelKind;
use crate::error::{ResourceError, StorageError, TransportError};
use crate::journal::LogEntry;
use crate::link::{ConnectionState, DeviceId, ScanFilter};
use crate::protocol::{Reading, VoltageLevel};

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// A point in time as seen by both timers and log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Monotonic milliseconds; drives every deadline.
    pub mono_ms: u64,
    /// Local wall-clock time; stamps readings and exports.
    pub wall: NaiveDateTime,
}

pub trait Clock {
    fn now(&self) -> Moment;
}

// ───────────────────────────────────────────────────────────────
// Log sink port (driven adapter: domain ↔ journal storage)
// ───────────────────────────────────────────────────────────────

/// Persistent journal storage.  Ordering is insertion order.
pub trait LogSink {
    fn insert(&mut self, entry: LogEntry) -> Result<(), StorageError>;

    /// Non-suppressed entries, newest first.
    fn query_visible(&self) -> Result<Vec<LogEntry>, StorageError>;

    /// All stored entries, suppressed ones included.
    fn count(&self) -> Result<usize, StorageError>;

    fn delete_oldest(&mut self) -> Result<(), StorageError>;

    fn clear_all(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Key-value port (driven adapter: domain ↔ preferences)
// ───────────────────────────────────────────────────────────────

/// Small string store.  Only used to remember the last good device.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ radio)
// ───────────────────────────────────────────────────────────────

/// Radio discovery and session establishment.
///
/// Discovered advertisements and push notifications are not returned from
/// these calls.  The adapter posts them into the link bus
/// ([`LinkBus`](crate::link::bus::LinkBus)) as `LinkEvent`s, which keeps
/// every mutation on the connection manager's task.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Session: TransportSession;

    async fn start_scan(&mut self, filter: &ScanFilter) -> Result<(), TransportError>;

    async fn stop_scan(&mut self) -> Result<(), TransportError>;

    async fn connect(&mut self, device: &DeviceId) -> Result<Self::Session, TransportError>;
}

/// One live connection to a sensor.
#[allow(async_fn_in_trait)]
pub trait TransportSession {
    /// Arm push notifications for `characteristic`.  Payloads arrive on
    /// the link bus as `LinkEvent::Notification`.
    async fn subscribe(&mut self, characteristic: u128) -> Result<(), TransportError>;

    async fn read(&mut self, characteristic: u128) -> Result<Vec<u8>, TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Alert output ports (driven adapter: domain → speaker / vibrator / screen)
// ───────────────────────────────────────────────────────────────

/// One independent alert output.
pub trait AlertChannel: Send {
    fn kind(&self) -> ChannelKind;

    /// Begin presenting an alert for `voltage`.
    fn start(&mut self, voltage: VoltageLevel) -> Result<(), ResourceError>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Update what a running channel presents.  Most channels have
    /// nothing voltage-specific to change.
    fn retarget(&mut self, _voltage: VoltageLevel) {}
}

/// Screen-wake resource.  Implementations must release by themselves once
/// `ceiling` has elapsed, even if `release` is never called.
pub trait WakeLock: Send {
    fn acquire(&mut self, ceiling: core::time::Duration) -> Result<(), ResourceError>;

    fn release(&mut self);

    fn is_held(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Link observer port (driving adapter: connection manager → domain)
// ───────────────────────────────────────────────────────────────

/// Receives the connection manager's outputs, in order, on its task.
pub trait LinkObserver {
    fn on_reading(&mut self, reading: &Reading);

    /// The current reading expired or the link went down.
    fn on_reading_cleared(&mut self);

    fn on_state_changed(&mut self, state: ConnectionState);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The pipeline emits structured [`PipelineEvent`](super::events::PipelineEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::PipelineEvent);
}
