//! Sensor link — discovery, connection, polling, watchdog, reading timeout.
//!
//! ```text
//!  ┌──────────────┐ start_scan ┌──────────┐ advert / select ┌────────────┐
//!  │ Disconnected │───────────▶│ Scanning │────────────────▶│ Connecting │
//!  └──────────────┘            └──────────┘                 └────────────┘
//!         ▲                                                       │ session up
//!         │ drop / stop / retries exhausted                       ▼
//!         └──────────────────────────────────────────────── ┌───────────┐
//!                                                            │ Connected │
//!                                                            └───────────┘
//! ```
//!
//! [`machine::LinkMachine`] holds every transition rule and timer as plain
//! synchronous state.  [`manager::ConnectionManager`] is the single async
//! task that owns it: it waits on the [`bus::LinkBus`] queue or the next
//! deadline, feeds the machine, and executes the actions it returns
//! against the transport.

pub mod bus;
pub mod machine;
pub mod manager;
pub mod scan;
pub mod timeout;
pub mod trail;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::protocol::Reading;

pub use scan::{CandidateSet, ScanFilter};

/// Key under which the last good device is remembered.
pub const LAST_DEVICE_KEY: &str = "last_connected_device";

// ───────────────────────────────────────────────────────────────
// Identity and discovery records
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Scanning => "SCANNING",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
        };
        f.write_str(s)
    }
}

/// Transport-level device address (MAC, platform handle, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A discovered candidate.  Lives for one scan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDevice {
    pub id: DeviceId,
    pub name: Option<String>,
    pub rssi: i16,
    pub services: Vec<u128>,
}

// ───────────────────────────────────────────────────────────────
// Machine inputs and outputs
// ───────────────────────────────────────────────────────────────

/// Everything that can happen to the link.  Operator requests, radio
/// callbacks and transport results all arrive as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Operator: begin discovery.
    StartScan,
    /// Operator: deliberate stop, no automatic rescan.
    Stop,
    /// Operator: connect to this discovered candidate.
    Select(DeviceId),
    /// Radio: an advertisement, with its manufacturer payload (may be empty).
    Advertisement {
        device: ScannedDevice,
        payload: Vec<u8>,
    },
    ScanFailed(TransportError),
    ConnectSucceeded(DeviceId),
    ConnectFailed(DeviceId, TransportError),
    Subscribed,
    SubscribeFailed(TransportError),
    /// Radio: push notification payload.
    Notification(Vec<u8>),
    /// Result of a periodic characteristic read.
    PollResult(Result<Vec<u8>, TransportError>),
    /// Radio: the session went away.
    Dropped,
    /// Stop and end the manager task.
    Shutdown,
}

/// Side effects requested by the machine, executed in order by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Subscribe,
    Poll,
    Disconnect,
    RememberDevice(DeviceId),
    Deliver(Reading),
    ReadingCleared,
    StopAlerts,
    StateChanged(ConnectionState),
}

/// Latest observable link status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub state: ConnectionState,
    /// Consecutive errors since the last good reading.
    pub error_count: u32,
    /// Human-readable status line.
    pub status: Option<&'static str>,
    pub latest: Option<Reading>,
    pub device: Option<DeviceId>,
    pub candidates: Vec<ScannedDevice>,
}
