//! VoltSentry — voltage sensor acquisition and alert pipeline.
//!
//! Decodes sensor packets, keeps one managed link to the sensor, journals
//! readings with duplicate suppression, and raises alerts on dangerous
//! levels.  Everything that touches a radio, a speaker or storage sits
//! behind a port trait in [`app::ports`]; host adapters live in
//! [`adapters`].

#![deny(unused_must_use)]

// Links the std critical-section impl behind embassy-sync's raw mutex.
use critical_section as _;

pub mod adapters;
pub mod alert;
pub mod app;
pub mod config;
pub mod error;
pub mod journal;
pub mod link;
pub mod protocol;
