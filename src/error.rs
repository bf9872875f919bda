//! Unified error types for the acquisition and alert pipeline.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level handling uniform.  Sub-errors are `Copy` so they can travel
//! through the link state machine and the event bus without allocation.
//!
//! ```text
//!   DecodeError     ── packet dropped, wait for the next one
//!   TransportError  ── bounded retry, then Disconnected
//!   ResourceError   ── channel skipped, alert continues degraded
//!   ConfigError     ── session refused at construction
//!   StorageError    ── log sink / key-value failure, logged and dropped
//! ```

use core::fmt;

use crate::protocol::VoltageLevel;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the pipeline funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A payload did not decode into a reading.
    Decode(DecodeError),
    /// The wireless transport failed.
    Transport(TransportError),
    /// An output channel or the wake resource is not available.
    Resource(ResourceError),
    /// Configuration is malformed.
    Config(ConfigError),
    /// Log sink or key-value store failed.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Resource(e) => write!(f, "resource: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Decode rejections
// ---------------------------------------------------------------------------

/// Why a payload was rejected.  Always recoverable: the packet is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length payload.
    Empty,
    /// No wire format accepts a payload of this length.
    WrongLength(usize),
    /// First byte is not the 0xAA header.
    BadHeader(u8),
    /// Last byte is not the 0x55 footer.
    BadFooter(u8),
    /// XOR of bytes 1..=3 does not match byte 4.
    BadChecksum { expected: u8, actual: u8 },
    /// Voltage code outside the catalogue.
    UnknownCode(u8),
    /// Code is valid but not accepted by this encoding or ingestion policy.
    PolicyRejected(VoltageLevel),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::WrongLength(n) => write!(f, "unsupported length {n}"),
            Self::BadHeader(b) => write!(f, "bad header 0x{b:02X}"),
            Self::BadFooter(b) => write!(f, "bad footer 0x{b:02X}"),
            Self::BadChecksum { expected, actual } => {
                write!(f, "checksum 0x{actual:02X}, expected 0x{expected:02X}")
            }
            Self::UnknownCode(c) => write!(f, "unknown voltage code 0x{c:02X}"),
            Self::PolicyRejected(v) => write!(f, "{v} not accepted on this path"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The radio refused to start or stop scanning.
    ScanFailed,
    /// Session establishment was refused.
    ConnectFailed,
    /// A connect or disconnect did not finish within its bound.
    Timeout,
    /// The remote end went away.
    Disconnected,
    /// Operation needs a session and there is none.
    NotConnected,
    /// Subscribing to push notifications failed.
    SubscribeFailed,
    /// Reading the characteristic failed.
    ReadFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanFailed => write!(f, "scan failed"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::Disconnected => write!(f, "remote disconnected"),
            Self::NotConnected => write!(f, "not connected"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::ReadFailed => write!(f, "read failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// The host has no such capability (no speaker, no vibrator, ...).
    Unavailable(&'static str),
    /// The capability exists but refused to start.
    StartFailed(&'static str),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(what) => write!(f, "{what} unavailable"),
            Self::StartFailed(what) => write!(f, "{what} failed to start"),
        }
    }
}

impl From<ResourceError> for Error {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A service or characteristic identifier is not a 128-bit UUID.
    /// The `&'static str` names the field.
    InvalidUuid(&'static str),
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUuid(field) => write!(f, "{field} is not a valid UUID"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key or entry does not exist.
    NotFound,
    /// Backing store is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
