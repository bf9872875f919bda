//! Voltage classification catalogue.
//!
//! | Level   | Code | Dangerous | Severity   |
//! |---------|------|-----------|------------|
//! | 220V    | 0x01 | no        | Caution    |
//! | 380V    | 0x02 | no        | Caution    |
//! | 22.9KV  | 0x03 | yes       | Danger     |
//! | 154KV   | 0x04 | yes       | Danger     |
//! | 345KV   | 0x05 | yes       | Danger     |
//! | 500KV   | 0x06 | yes       | Danger     |
//! | 765KV   | 0x07 | yes       | Danger     |
//! | DIAG_OK | 0xF0 | no        | Diagnostic |
//! | DIAG_NG | 0xF1 | no        | Diagnostic |

use core::fmt;

use serde::{Deserialize, Serialize};

/// A recognised voltage classification.  Unknown wire codes never
/// construct a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoltageLevel {
    V220,
    V380,
    Kv22_9,
    Kv154,
    Kv345,
    Kv500,
    Kv765,
    DiagOk,
    DiagNg,
}

/// Presentation class used by the visual alert channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Caution,
    Danger,
    Diagnostic,
}

impl VoltageLevel {
    /// Every variant, in wire-code order.
    pub const ALL: [Self; 9] = [
        Self::V220,
        Self::V380,
        Self::Kv22_9,
        Self::Kv154,
        Self::Kv345,
        Self::Kv500,
        Self::Kv765,
        Self::DiagOk,
        Self::DiagNg,
    ];

    /// The seven measured (non-diagnostic) levels.
    pub const MEASURED: [Self; 7] = [
        Self::V220,
        Self::V380,
        Self::Kv22_9,
        Self::Kv154,
        Self::Kv345,
        Self::Kv500,
        Self::Kv765,
    ];

    pub const fn code(self) -> u8 {
        match self {
            Self::V220 => 0x01,
            Self::V380 => 0x02,
            Self::Kv22_9 => 0x03,
            Self::Kv154 => 0x04,
            Self::Kv345 => 0x05,
            Self::Kv500 => 0x06,
            Self::Kv765 => 0x07,
            Self::DiagOk => 0xF0,
            Self::DiagNg => 0xF1,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::V220),
            0x02 => Some(Self::V380),
            0x03 => Some(Self::Kv22_9),
            0x04 => Some(Self::Kv154),
            0x05 => Some(Self::Kv345),
            0x06 => Some(Self::Kv500),
            0x07 => Some(Self::Kv765),
            0xF0 => Some(Self::DiagOk),
            0xF1 => Some(Self::DiagNg),
            _ => None,
        }
    }

    /// Whether this level must raise an alert.
    pub const fn is_dangerous(self) -> bool {
        matches!(
            self,
            Self::Kv22_9 | Self::Kv154 | Self::Kv345 | Self::Kv500 | Self::Kv765
        )
    }

    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::DiagOk | Self::DiagNg)
    }

    pub const fn severity(self) -> Severity {
        match self {
            Self::V220 | Self::V380 => Severity::Caution,
            Self::DiagOk | Self::DiagNg => Severity::Diagnostic,
            _ => Severity::Danger,
        }
    }

    /// Label used in log lines and exports.
    pub const fn display(self) -> &'static str {
        match self {
            Self::V220 => "220V",
            Self::V380 => "380V",
            Self::Kv22_9 => "22.9KV",
            Self::Kv154 => "154KV",
            Self::Kv345 => "345KV",
            Self::Kv500 => "500KV",
            Self::Kv765 => "765KV",
            Self::DiagOk => "DIAG_OK",
            Self::DiagNg => "DIAG_NG",
        }
    }
}

impl fmt::Display for VoltageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}
