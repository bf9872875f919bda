//! Danger alerting — one shared coordinator over independent outputs.
//!
//! ```text
//!   live readings ─┐
//!                  ├──▶ AlertCoordinator ──▶ Audible / Haptic / Visual
//!   test commands ─┘          │
//!   link teardown ────────────┘──▶ WakeLock (hard ceiling)
//! ```

pub mod coordinator;
pub mod patterns;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use coordinator::AlertCoordinator;

/// Output channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    Audible,
    Haptic,
    Visual,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Audible => "audible",
            Self::Haptic => "haptic",
            Self::Visual => "visual",
        };
        f.write_str(s)
    }
}
