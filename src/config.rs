//! Pipeline configuration parameters
//!
//! All tunable parameters for the acquisition and alert pipeline.
//! Every struct is `#[serde(default)]`, so a JSON document only needs the
//! fields it overrides.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::link::scan::parse_uuid;
use crate::protocol::RawPolicy;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub link: LinkConfig,
    pub alert: AlertConfig,
    pub journal: JournalConfig,
}

impl PipelineConfig {
    /// Reject values that would stall or spin the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.link.validate()?;
        self.alert.validate()?;
        self.journal.validate()
    }
}

/// How readings reach the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMode {
    /// Connect, subscribe, poll, watchdog.
    #[default]
    Session,
    /// Readings come from advertisements only; no session is opened.
    Broadcast,
}

/// Connection manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub mode: LinkMode,

    // --- Discovery ---
    /// Sensor GATT service (128-bit UUID, hyphenated)
    pub service_uuid: String,
    /// Characteristic carrying readings
    pub characteristic_uuid: String,
    /// Advertised-name prefixes that identify a sensor (case-insensitive)
    pub name_prefixes: Vec<String>,
    /// Codes accepted from single-byte advertisement payloads
    pub advertisement_policy: RawPolicy,
    /// Wait for more candidates after the first one (ms)
    pub scan_settle_ms: u64,

    // --- Session ---
    /// Silence after the last reading before it is cleared (ms)
    pub reading_timeout_ms: u64,
    /// Characteristic re-read interval (ms)
    pub poll_interval_ms: u64,
    /// Stale-data watchdog period (ms)
    pub watchdog_interval_ms: u64,
    /// Consecutive poll failures before notifications are re-armed
    pub max_poll_failures: u32,
    /// Accept poll results only within this long of the last notification (ms)
    pub stale_read_window_ms: Option<u64>,

    // --- Connect / retry ---
    /// Per-attempt connect bound (ms)
    pub connect_timeout_ms: u64,
    /// Attempts per candidate
    pub connect_attempts: u32,
    /// Delay between attempts (ms)
    pub retry_delay_ms: u64,
    /// Cleanup disconnect bound (ms)
    pub disconnect_timeout_ms: u64,
    /// Delay before scanning resumes after an unplanned disconnect (ms)
    pub rescan_delay_ms: u64,
    /// Exhausted connect cycles in a row before auto-rescan gives up
    pub max_failed_cycles: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mode: LinkMode::Session,

            service_uuid: "0000fff0-0000-1000-8000-00805f9b34fb".into(),
            characteristic_uuid: "0000fff1-0000-1000-8000-00805f9b34fb".into(),
            name_prefixes: [
                "ST9401-UP",
                "ST940I-UP",
                "ESSYSTEM",
                "VoltSensor",
                "HM-10",
                "JDY-08",
                "MLT-BT05",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            advertisement_policy: RawPolicy::DangerousOnly,
            scan_settle_ms: 1500,

            reading_timeout_ms: 2000,
            poll_interval_ms: 500,
            watchdog_interval_ms: 15_000,
            max_poll_failures: 30,
            stale_read_window_ms: None,

            connect_timeout_ms: 10_000,
            connect_attempts: 3,
            retry_delay_ms: 100,
            disconnect_timeout_ms: 2000,
            rescan_delay_ms: 1000,
            max_failed_cycles: 5,
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_uuid(&self.service_uuid).ok_or(ConfigError::InvalidUuid("service_uuid"))?;
        parse_uuid(&self.characteristic_uuid)
            .ok_or(ConfigError::InvalidUuid("characteristic_uuid"))?;

        let positive = [
            (self.reading_timeout_ms, "reading_timeout_ms must be > 0"),
            (self.poll_interval_ms, "poll_interval_ms must be > 0"),
            (self.watchdog_interval_ms, "watchdog_interval_ms must be > 0"),
            (self.connect_timeout_ms, "connect_timeout_ms must be > 0"),
            (self.disconnect_timeout_ms, "disconnect_timeout_ms must be > 0"),
        ];
        for (value, msg) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationFailed(msg));
            }
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::ValidationFailed("connect_attempts must be >= 1"));
        }
        if self.max_poll_failures == 0 {
            return Err(ConfigError::ValidationFailed("max_poll_failures must be >= 1"));
        }
        if self.stale_read_window_ms == Some(0) {
            return Err(ConfigError::ValidationFailed("stale_read_window_ms must be > 0"));
        }
        Ok(())
    }
}

/// Alert coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Hard ceiling on the screen-wake hold (seconds)
    pub wake_ceiling_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            wake_ceiling_secs: 600, // 10 min
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wake_ceiling_secs == 0 {
            return Err(ConfigError::ValidationFailed("wake_ceiling_secs must be > 0"));
        }
        Ok(())
    }
}

/// Event journal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Retained entries (oldest deleted first)
    pub max_entries: usize,
    /// Skip a reading of the same voltage within the same second
    pub dedup_same_second: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            max_entries: 99,
            dedup_same_second: true,
        }
    }
}

impl JournalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::ValidationFailed("max_entries must be >= 1"));
        }
        Ok(())
    }
}
