//! Sensor wire protocol — pure decoding, no state, no I/O.
//!
//! ```text
//!   bytes ──▶ text ──▶ framed ──▶ raw ──▶ long ──▶ Reading
//!              │         │         │        │
//!              └─────────┴────┬────┴────────┘
//!                             ▼
//!                        DecodeError
//! ```
//!
//! Formats are tried in a fixed order so that a payload matching a more
//! specific encoding is never misread by a looser one.  A 10-byte payload
//! that passes every long-form check is taken as a long packet first,
//! since its reserved bytes are free to hold anything.  The raw
//! single-byte encoding only applies to advertisements, or to stream
//! payloads that are exactly one byte long.

pub mod packet;
pub mod reading;
pub mod stream;
pub mod text;
pub mod voltage;

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

pub use packet::{RawPolicy, encode};
pub use reading::Reading;
pub use voltage::{Severity, VoltageLevel};

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadSource {
    /// Unsolicited broadcast (manufacturer data).
    Advertisement,
    /// Push notification or poll read on a live session.
    Session,
}

/// Multi-format payload decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketDecoder {
    advertisement_policy: RawPolicy,
}

impl PacketDecoder {
    pub fn new(advertisement_policy: RawPolicy) -> Self {
        Self {
            advertisement_policy,
        }
    }

    /// Decode `bytes` received at `at` into a reading.
    pub fn decode(
        &self,
        bytes: &[u8],
        source: PayloadSource,
        at: NaiveDateTime,
    ) -> Result<Reading, DecodeError> {
        let result = self.decode_inner(bytes, source);
        match result {
            Ok((voltage, sequence)) => Ok(Reading::new(voltage, at, sequence, bytes.to_vec())),
            Err(e) => {
                debug!("decode: {:?} payload of {} bytes rejected: {}", source, bytes.len(), e);
                Err(e)
            }
        }
    }

    fn decode_inner(
        &self,
        bytes: &[u8],
        source: PayloadSource,
    ) -> Result<(VoltageLevel, u16), DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        // Reserved bytes of a long packet may spell text; a packet that
        // passes every long-form check is never rescanned as text.
        if bytes.len() == packet::LONG_LEN && bytes[0] == packet::HEADER {
            if let Ok(decoded) = packet::decode_long(bytes) {
                return Ok(decoded);
            }
        }

        if let Some(voltage) = text::decode_text(bytes) {
            return Ok((voltage, 0));
        }

        if bytes.len() == packet::FRAMED_LEN && bytes[0] == packet::HEADER {
            return packet::decode_framed(bytes).map(|v| (v, 0));
        }

        let mut last_err = DecodeError::WrongLength(bytes.len());

        let raw_policy = match source {
            PayloadSource::Advertisement => Some(self.advertisement_policy),
            PayloadSource::Session if bytes.len() == 1 => Some(RawPolicy::AnyMeasured),
            PayloadSource::Session => None,
        };
        if let Some(policy) = raw_policy {
            match packet::decode_raw(bytes, policy) {
                Ok(voltage) => return Ok((voltage, 0)),
                Err(e) => last_err = e,
            }
        }

        if bytes.len() == packet::LONG_LEN {
            return packet::decode_long(bytes);
        }

        Err(last_err)
    }
}

/// Decode with the default advertisement policy.
pub fn decode(
    bytes: &[u8],
    source: PayloadSource,
    at: NaiveDateTime,
) -> Result<Reading, DecodeError> {
    PacketDecoder::default().decode(bytes, source, at)
}
