//! Alert coordinator.
//!
//! Owns every output channel and the wake resource.  Constructed once and
//! shared (`Arc`) by every path that can raise or silence an alert, so
//! `stop_all` always reaches every channel that was ever started.
//!
//! ## Rules
//!
//! - `trigger` on a non-dangerous level is a logged no-op.
//! - A channel that is already running is never started twice; it is
//!   retargeted if the level changed.
//! - A channel that fails to start is skipped and the alert proceeds on
//!   the rest (degraded mode).  With nothing running the alert is
//!   `Unavailable` and the wake resource is left alone.
//! - `stop_all` is idempotent and has no dependency on any UI surface.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::{AlertChannel, WakeLock};
use crate::config::AlertConfig;
use crate::protocol::VoltageLevel;

/// Result of a `trigger` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Level is not dangerous; nothing changed.
    Ignored,
    /// At least one channel newly started.
    Started { channels: usize, degraded: usize },
    /// Every available channel was already running.
    AlreadyActive,
    /// No channel is running: every one failed to start, or none exist.
    Unavailable { degraded: usize },
}

struct AlertState {
    channels: Vec<Box<dyn AlertChannel>>,
    wake: Option<Box<dyn WakeLock>>,
    active_voltage: Option<VoltageLevel>,
    triggers: u64,
}

pub struct AlertCoordinator {
    state: Mutex<AlertState>,
    wake_ceiling: Duration,
}

impl AlertCoordinator {
    pub fn new(
        channels: Vec<Box<dyn AlertChannel>>,
        wake: Option<Box<dyn WakeLock>>,
        config: &AlertConfig,
    ) -> Self {
        if wake.is_none() {
            warn!("alert: no wake resource, screen may sleep during alerts");
        }
        Self {
            state: Mutex::new(AlertState {
                channels,
                wake,
                active_voltage: None,
                triggers: 0,
            }),
            wake_ceiling: Duration::from_secs(config.wake_ceiling_secs),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AlertState> {
        // A panicking channel must not disable stop_all.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn trigger(&self, voltage: VoltageLevel) -> TriggerOutcome {
        if !voltage.is_dangerous() {
            warn!("alert: trigger({}) ignored, not a dangerous level", voltage);
            return TriggerOutcome::Ignored;
        }

        let mut st = self.lock();
        let retarget = st.active_voltage.is_some_and(|v| v != voltage);
        let mut started = 0;
        let mut running = 0;
        let mut degraded = 0;

        for ch in &mut st.channels {
            if ch.is_running() {
                if retarget {
                    ch.retarget(voltage);
                }
                running += 1;
                continue;
            }
            match ch.start(voltage) {
                Ok(()) => started += 1,
                Err(e) => {
                    degraded += 1;
                    warn!("alert: {} channel unavailable ({}), continuing without it", ch.kind(), e);
                }
            }
        }

        if started + running == 0 {
            warn!("alert: {} not raised, no output channel available", voltage);
            return TriggerOutcome::Unavailable { degraded };
        }

        let ceiling = self.wake_ceiling;
        if let Some(wake) = st.wake.as_mut() {
            if !wake.is_held() {
                if let Err(e) = wake.acquire(ceiling) {
                    warn!("alert: wake resource unavailable: {}", e);
                }
            }
        }

        st.active_voltage = Some(voltage);
        if started == 0 {
            return TriggerOutcome::AlreadyActive;
        }
        st.triggers += 1;
        info!("alert: {} raised on {} channel(s)", voltage, started);
        TriggerOutcome::Started {
            channels: started,
            degraded,
        }
    }

    /// Stop every channel and release the wake resource.  Returns `true`
    /// if anything was running.
    pub fn stop_all(&self) -> bool {
        let mut st = self.lock();
        let mut stopped = false;
        for ch in &mut st.channels {
            if ch.is_running() {
                ch.stop();
                stopped = true;
            }
        }
        if let Some(wake) = st.wake.as_mut() {
            if wake.is_held() {
                wake.release();
                stopped = true;
            }
        }
        if st.active_voltage.take().is_some() || stopped {
            info!("alert: all channels stopped");
        }
        stopped
    }

    /// Any output channel running.
    pub fn is_active(&self) -> bool {
        self.lock().channels.iter().any(|c| c.is_running())
    }

    pub fn active_voltage(&self) -> Option<VoltageLevel> {
        self.lock().active_voltage
    }

    /// Calls that newly started at least one channel.
    pub fn trigger_count(&self) -> u64 {
        self.lock().triggers
    }

    pub fn wake_ceiling(&self) -> Duration {
        self.wake_ceiling
    }
}
