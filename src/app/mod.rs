//! Application core — routing between link, journal and alerts.
//!
//! This module contains the orchestration rules of the pipeline: what
//! gets logged, when an alert is raised, what an operator command does.
//! All interaction with storage, radios and outputs happens through
//! **port traits** defined in [`ports`], keeping this layer testable with
//! mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

pub use commands::AppCommand;
pub use events::PipelineEvent;
pub use service::Pipeline;
