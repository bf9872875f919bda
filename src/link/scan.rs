//! Discovery filter and candidate bookkeeping.

use crate::config::LinkConfig;
use crate::error::ConfigError;

use super::{DeviceId, ScannedDevice};

/// Parse a hyphenated 128-bit UUID (`8-4-4-4-12` hex groups).
pub fn parse_uuid(s: &str) -> Option<u128> {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let mut parts = s.split('-');
    let mut value: u128 = 0;
    for len in GROUPS {
        let part = parts.next()?;
        if part.len() != len || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let group = u128::from_str_radix(part, 16).ok()?;
        value = (value << (len * 4)) | group;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(value)
}

/// Which advertisements belong to a sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub service: u128,
    pub characteristic: u128,
    /// Lower-cased name prefixes.
    pub name_prefixes: Vec<String>,
}

impl ScanFilter {
    pub fn from_config(cfg: &LinkConfig) -> Result<Self, ConfigError> {
        let service =
            parse_uuid(&cfg.service_uuid).ok_or(ConfigError::InvalidUuid("service_uuid"))?;
        let characteristic = parse_uuid(&cfg.characteristic_uuid)
            .ok_or(ConfigError::InvalidUuid("characteristic_uuid"))?;
        Ok(Self {
            service,
            characteristic,
            name_prefixes: cfg.name_prefixes.iter().map(|p| p.to_lowercase()).collect(),
        })
    }

    /// Name prefix match (case-insensitive) or advertised service match.
    pub fn matches(&self, device: &ScannedDevice) -> bool {
        let by_name = device.name.as_deref().is_some_and(|name| {
            let name = name.to_lowercase();
            self.name_prefixes.iter().any(|p| name.starts_with(p.as_str()))
        });
        by_name || device.services.contains(&self.service)
    }
}

/// Candidates seen during the current scan.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    devices: Vec<ScannedDevice>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a candidate.  Returns `true` if it is new.
    pub fn upsert(&mut self, device: ScannedDevice) -> bool {
        match self.devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => {
                existing.rssi = device.rssi;
                if device.name.is_some() {
                    existing.name = device.name;
                }
                for s in device.services {
                    if !existing.services.contains(&s) {
                        existing.services.push(s);
                    }
                }
                false
            }
            None => {
                self.devices.push(device);
                true
            }
        }
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.iter().any(|d| &d.id == id)
    }

    /// Connection order: `preferred` first if seen, then strongest signal.
    pub fn ranked(&self, preferred: Option<&DeviceId>) -> Vec<DeviceId> {
        let mut sorted: Vec<&ScannedDevice> = self.devices.iter().collect();
        sorted.sort_by(|a, b| b.rssi.cmp(&a.rssi));

        let lead = preferred.filter(|p| self.contains(p));
        lead.cloned()
            .into_iter()
            .chain(
                sorted
                    .into_iter()
                    .map(|d| &d.id)
                    .filter(|id| Some(*id) != lead)
                    .cloned(),
            )
            .collect()
    }

    pub fn devices(&self) -> &[ScannedDevice] {
        &self.devices
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
