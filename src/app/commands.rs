//! Inbound operator commands.
//!
//! These represent actions requested by the outside world (a UI, a
//! shell, a test harness) that the [`Pipeline`](super::service::Pipeline)
//! interprets and acts upon.

use crate::link::DeviceId;
use crate::protocol::VoltageLevel;

/// Commands that external adapters can send into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Begin scanning for a sensor.
    StartMonitoring,

    /// Deliberate stop: disconnect and do not rescan.
    StopMonitoring,

    /// Connect to a candidate seen during the current scan.
    SelectDevice(DeviceId),

    /// Raise an alert manually through the shared coordinator.
    TestAlert(VoltageLevel),

    /// Silence every alert channel.
    StopAlerts,

    /// Forget the duplicate streak so the next readings log again.
    ResetDuplicateFilter,

    /// Delete every journal entry.
    ClearLog,

    /// Stop monitoring and end the connection manager task.
    Shutdown,
}
