//! Decoded sensor reading value object.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::VoltageLevel;

/// One decoded reading.  Equality is structural over every field,
/// including the raw payload it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    voltage: VoltageLevel,
    timestamp: NaiveDateTime,
    sequence_number: u16,
    raw_bytes: Vec<u8>,
}

impl Reading {
    pub fn new(
        voltage: VoltageLevel,
        timestamp: NaiveDateTime,
        sequence_number: u16,
        raw_bytes: Vec<u8>,
    ) -> Self {
        Self {
            voltage,
            timestamp,
            sequence_number,
            raw_bytes,
        }
    }

    pub fn voltage(&self) -> VoltageLevel {
        self.voltage
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Packet sequence number; 0 for encodings that do not carry one.
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn is_dangerous(&self) -> bool {
        self.voltage.is_dangerous()
    }
}
