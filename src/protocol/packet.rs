//! Binary wire encodings.
//!
//! Long authenticated packet (10 bytes):
//! ```text
//! ┌──────┬──────┬────────┬────────┬──────┬─────────────┬──────┐
//! │ 0xAA │ code │ seq hi │ seq lo │ xor  │ reserved ×4 │ 0x55 │
//! └──────┴──────┴────────┴────────┴──────┴─────────────┴──────┘
//!    0      1       2        3       4       5..=8        9
//! ```
//! `xor` = byte1 ^ byte2 ^ byte3.  Reserved bytes are never validated.
//!
//! Framed short packet (3 bytes): `[0xAA][code][0x55]`.
//!
//! Raw packet: the first byte is the voltage code, the rest is ignored.

use serde::{Deserialize, Serialize};

use super::VoltageLevel;
use crate::error::DecodeError;

pub const HEADER: u8 = 0xAA;
pub const FOOTER: u8 = 0x55;

/// Length of the long authenticated packet.
pub const LONG_LEN: usize = 10;

/// Length of the framed short packet.
pub const FRAMED_LEN: usize = 3;

/// Bluetooth SIG company identifier the sensor firmware uses for its
/// manufacturer-specific advertisement data (Espressif).
pub const COMPANY_ID: u16 = 0x02E5;

/// Which codes the raw single-byte encoding may yield.
///
/// Diagnostic codes are never accepted on the raw path; they only mean
/// something inside the long packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RawPolicy {
    /// Any measured level.
    AnyMeasured,
    /// Only dangerous levels (broadcast-only ingestion).
    #[default]
    DangerousOnly,
}

/// XOR of the code and both sequence bytes.
pub const fn checksum(code: u8, sequence: u16) -> u8 {
    let [hi, lo] = sequence.to_be_bytes();
    code ^ hi ^ lo
}

/// Build a valid long packet.  Reserved bytes are zero-filled.
pub fn encode(voltage: VoltageLevel, sequence: u16) -> [u8; LONG_LEN] {
    let code = voltage.code();
    let [hi, lo] = sequence.to_be_bytes();
    [
        HEADER,
        code,
        hi,
        lo,
        checksum(code, sequence),
        0,
        0,
        0,
        0,
        FOOTER,
    ]
}

/// Decode the 10-byte long packet into `(voltage, sequence)`.
pub fn decode_long(bytes: &[u8]) -> Result<(VoltageLevel, u16), DecodeError> {
    if bytes.len() != LONG_LEN {
        return Err(DecodeError::WrongLength(bytes.len()));
    }
    if bytes[0] != HEADER {
        return Err(DecodeError::BadHeader(bytes[0]));
    }
    if bytes[LONG_LEN - 1] != FOOTER {
        return Err(DecodeError::BadFooter(bytes[LONG_LEN - 1]));
    }

    let code = bytes[1];
    let sequence = u16::from_be_bytes([bytes[2], bytes[3]]);
    let expected = checksum(code, sequence);
    if bytes[4] != expected {
        return Err(DecodeError::BadChecksum {
            expected,
            actual: bytes[4],
        });
    }

    let voltage = VoltageLevel::from_code(code).ok_or(DecodeError::UnknownCode(code))?;
    Ok((voltage, sequence))
}

/// Decode the 3-byte framed packet.
pub fn decode_framed(bytes: &[u8]) -> Result<VoltageLevel, DecodeError> {
    if bytes.len() != FRAMED_LEN {
        return Err(DecodeError::WrongLength(bytes.len()));
    }
    if bytes[0] != HEADER {
        return Err(DecodeError::BadHeader(bytes[0]));
    }
    if bytes[2] != FOOTER {
        return Err(DecodeError::BadFooter(bytes[2]));
    }
    let voltage = VoltageLevel::from_code(bytes[1]).ok_or(DecodeError::UnknownCode(bytes[1]))?;
    if voltage.is_diagnostic() {
        return Err(DecodeError::PolicyRejected(voltage));
    }
    Ok(voltage)
}

/// Interpret the first byte as a voltage code.
pub fn decode_raw(bytes: &[u8], policy: RawPolicy) -> Result<VoltageLevel, DecodeError> {
    let &code = bytes.first().ok_or(DecodeError::Empty)?;
    let voltage = VoltageLevel::from_code(code).ok_or(DecodeError::UnknownCode(code))?;

    let accepted = match policy {
        RawPolicy::AnyMeasured => !voltage.is_diagnostic(),
        RawPolicy::DangerousOnly => voltage.is_dangerous(),
    };
    if accepted {
        Ok(voltage)
    } else {
        Err(DecodeError::PolicyRejected(voltage))
    }
}
