//! Simulated sensor transport.
//!
//! Implements [`Transport`] for a single fake sensor so the whole pipeline
//! runs on a host with no radio.  Split in two halves sharing atomics:
//!
//! ```text
//!  ConnectionManager ──calls──▶ SimulatedSensor / SimSession
//!                                      │ flags
//!                                      ▼
//!  LinkBus ◀──Advertisement / Notification── SimRadio (own task)
//! ```
//!
//! In session mode every third notification is withheld and only served
//! to the next poll read, which exercises the poll fallback.  In
//! broadcast mode packets ride in the advertisement payload.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info};

use crate::app::ports::{Transport, TransportSession};
use crate::config::LinkMode;
use crate::error::{ConfigError, TransportError};
use crate::link::bus::LinkBus;
use crate::link::{DeviceId, LinkEvent, ScanFilter, ScannedDevice};
use crate::protocol::{VoltageLevel, encode};

pub const SIM_DEVICE_ID: &str = "SIM:00:00:00:00:01";
pub const SIM_DEVICE_NAME: &str = "ST9401-UP-SIM";

/// Scripted reading sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Safe,
    Danger,
    Mixed,
    DuplicateTest,
    AllVoltages,
}

impl Scenario {
    pub fn voltages(self) -> Vec<VoltageLevel> {
        use VoltageLevel::{Kv22_9, Kv154, Kv345, Kv765, V220, V380};
        match self {
            Self::Safe => vec![V220, V380, V220, V380, V220],
            Self::Danger => vec![Kv154; 5],
            Self::Mixed => vec![V220, Kv22_9, Kv22_9, V380, Kv345, Kv765, V220],
            Self::DuplicateTest => [vec![Kv154; 6], vec![V220], vec![Kv154; 2]].concat(),
            Self::AllVoltages => VoltageLevel::ALL.to_vec(),
        }
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "danger" => Ok(Self::Danger),
            "mixed" => Ok(Self::Mixed),
            "duplicate" | "duplicatetest" => Ok(Self::DuplicateTest),
            "all" | "allvoltages" => Ok(Self::AllVoltages),
            _ => Err(ConfigError::ValidationFailed("unknown scenario")),
        }
    }
}

#[derive(Default)]
struct SimShared {
    scanning: AtomicBool,
    connected: AtomicBool,
    subscribed: AtomicBool,
    connect_failures_left: AtomicU32,
    withheld: Mutex<Option<Vec<u8>>>,
}

impl SimShared {
    fn withheld(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.withheld.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sim_device() -> ScannedDevice {
    ScannedDevice {
        id: DeviceId::from(SIM_DEVICE_ID),
        name: Some(SIM_DEVICE_NAME.to_string()),
        rssi: -55,
        services: Vec::new(),
    }
}

// ── Transport half ───────────────────────────────────────────

pub struct SimulatedSensor {
    shared: Arc<SimShared>,
}

impl SimulatedSensor {
    /// Transport and radio halves for one fake sensor posting to `bus`.
    pub fn new(bus: Arc<LinkBus>, scenario: Scenario, mode: LinkMode) -> (Self, SimRadio) {
        let shared = Arc::new(SimShared::default());
        let radio = SimRadio {
            bus,
            shared: shared.clone(),
            script: scenario.voltages(),
            mode,
        };
        (Self { shared }, radio)
    }

    /// Make the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.shared.connect_failures_left.store(n, Ordering::SeqCst);
    }
}

impl Transport for SimulatedSensor {
    type Session = SimSession;

    async fn start_scan(&mut self, _filter: &ScanFilter) -> Result<(), TransportError> {
        debug!("sim: scanning");
        self.shared.scanning.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.shared.scanning.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&mut self, device: &DeviceId) -> Result<SimSession, TransportError> {
        if device.0 != SIM_DEVICE_ID {
            return Err(TransportError::ConnectFailed);
        }
        let failing = self
            .shared
            .connect_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            info!("sim: refusing connection to {}", device);
            return Err(TransportError::ConnectFailed);
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(SimSession {
            shared: self.shared.clone(),
        })
    }
}

pub struct SimSession {
    shared: Arc<SimShared>,
}

impl TransportSession for SimSession {
    async fn subscribe(&mut self, _characteristic: u128) -> Result<(), TransportError> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.shared.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&mut self, _characteristic: u128) -> Result<Vec<u8>, TransportError> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        self.shared.withheld().take().ok_or(TransportError::ReadFailed)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.shared.subscribed.store(false, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ── Radio half ───────────────────────────────────────────────

pub struct SimRadio {
    bus: Arc<LinkBus>,
    shared: Arc<SimShared>,
    script: Vec<VoltageLevel>,
    mode: LinkMode,
}

impl SimRadio {
    /// Emit the script, one packet per `interval`, then return.
    pub async fn run(self, interval: Duration) {
        let mut script = self.script.iter().copied();
        let mut seq: u16 = 0;
        let mut sent: u32 = 0;

        loop {
            async_io_mini::Timer::after(interval).await;

            let scanning = self.shared.scanning.load(Ordering::SeqCst);
            let subscribed = self.shared.subscribed.load(Ordering::SeqCst);
            let broadcast = self.mode == LinkMode::Broadcast;

            if scanning && !broadcast {
                self.bus.post(LinkEvent::Advertisement {
                    device: sim_device(),
                    payload: Vec::new(),
                });
            }
            if !(subscribed || (broadcast && scanning)) {
                continue;
            }

            let Some(voltage) = script.next() else {
                info!("sim: script finished after {} packets", sent);
                return;
            };
            seq = seq.wrapping_add(1);
            sent += 1;
            let packet = encode(voltage, seq).to_vec();
            debug!("sim: {} seq={}", voltage, seq);

            if broadcast {
                self.bus.post(LinkEvent::Advertisement {
                    device: sim_device(),
                    payload: packet,
                });
            } else if sent % 3 == 0 {
                *self.shared.withheld() = Some(packet);
            } else {
                self.bus.post(LinkEvent::Notification(packet));
            }
        }
    }
}
