//! Pipeline — the hexagonal core.
//!
//! [`Pipeline`] owns the journal and routes link output to it and to the
//! shared alert coordinator.  It owns no I/O resources: storage, outputs
//! and events all flow through port traits.
//!
//! ```text
//!  ConnectionManager ──▶ ┌──────────────────────┐ ──▶ EventSink
//!   (LinkObserver)       │       Pipeline        │
//!                        │ Journal · alert rule  │ ──▶ AlertCoordinator
//!  AppCommand ─────────▶ └──────────────────────┘ ──▶ LinkBus
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDateTime;
use log::{error, info, warn};

use crate::alert::AlertCoordinator;
use crate::alert::coordinator::TriggerOutcome;
use crate::config::JournalConfig;
use crate::error::StorageError;
use crate::journal::{ExportDocument, Journal, RecordOutcome};
use crate::link::bus::LinkBus;
use crate::link::{ConnectionState, LinkEvent};
use crate::protocol::{Reading, VoltageLevel};

use super::commands::AppCommand;
use super::events::PipelineEvent;
use super::ports::{EventSink, LinkObserver, LogSink};

// ───────────────────────────────────────────────────────────────
// Pipeline
// ───────────────────────────────────────────────────────────────

pub struct Pipeline<S: LogSink, E: EventSink> {
    journal: Journal<S>,
    alerts: Arc<AlertCoordinator>,
    events: E,
    current: Option<Reading>,
    /// Level the last live alert was raised for.  Cleared by a safe
    /// reading or a lost reading, so the next danger alerts again.
    last_alerted: Option<VoltageLevel>,
    link_state: ConnectionState,
}

impl<S: LogSink, E: EventSink> Pipeline<S, E> {
    pub fn new(sink: S, events: E, alerts: Arc<AlertCoordinator>, config: JournalConfig) -> Self {
        Self {
            journal: Journal::new(sink, config),
            alerts,
            events,
            current: None,
            last_alerted: None,
            link_state: ConnectionState::Disconnected,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.  Link commands are posted to `bus`;
    /// returns `false` if one could not be queued.
    pub fn handle_command(&mut self, cmd: AppCommand, bus: &LinkBus) -> bool {
        info!("command: {:?}", cmd);
        let link_event = match &cmd {
            AppCommand::StartMonitoring => Some(LinkEvent::StartScan),
            AppCommand::StopMonitoring => Some(LinkEvent::Stop),
            AppCommand::SelectDevice(id) => Some(LinkEvent::Select(id.clone())),
            AppCommand::Shutdown => Some(LinkEvent::Shutdown),
            AppCommand::TestAlert(voltage) => {
                self.raise(*voltage);
                None
            }
            AppCommand::StopAlerts => {
                // The last alerted level stays, so the same level streaming
                // on does not re-raise until it changes or clears.
                if self.alerts.stop_all() {
                    self.events.emit(&PipelineEvent::AlertsStopped);
                }
                None
            }
            AppCommand::ResetDuplicateFilter => {
                self.journal.reset_duplicate_filter();
                None
            }
            AppCommand::ClearLog => {
                if let Err(e) = self.journal.clear() {
                    self.storage_failed(e);
                }
                None
            }
        };

        let Some(event) = link_event else {
            return true;
        };
        if bus.post(event) {
            return true;
        }
        error!("command {:?} dropped, link bus full", cmd);
        self.events.emit(&PipelineEvent::CommandDropped(cmd));
        false
    }

    // ── Internals ─────────────────────────────────────────────

    fn raise(&mut self, voltage: VoltageLevel) {
        match self.alerts.trigger(voltage) {
            TriggerOutcome::Started { .. } => {
                self.events.emit(&PipelineEvent::AlertRaised(voltage));
            }
            TriggerOutcome::Unavailable { .. } => {
                self.events.emit(&PipelineEvent::AlertUnavailable(voltage));
            }
            TriggerOutcome::Ignored | TriggerOutcome::AlreadyActive => {}
        }
    }

    fn storage_failed(&mut self, e: StorageError) {
        warn!("journal: {}", e);
        self.events.emit(&PipelineEvent::StorageFailed(e));
    }

    // ── Queries ───────────────────────────────────────────────

    /// Formatted visible log lines, newest first.
    pub fn visible_lines(&self) -> Result<Vec<String>, StorageError> {
        self.journal.visible_lines()
    }

    pub fn export(
        &self,
        debug_lines: &[String],
        now: NaiveDateTime,
    ) -> Result<Option<ExportDocument>, StorageError> {
        self.journal.export(debug_lines, now)
    }

    pub fn current_reading(&self) -> Option<&Reading> {
        self.current.as_ref()
    }

    pub fn link_state(&self) -> ConnectionState {
        self.link_state
    }

    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }

    pub fn alerts(&self) -> &Arc<AlertCoordinator> {
        &self.alerts
    }

    pub fn events(&self) -> &E {
        &self.events
    }
}

impl<S: LogSink, E: EventSink> LinkObserver for Pipeline<S, E> {
    fn on_reading(&mut self, reading: &Reading) {
        self.current = Some(reading.clone());
        self.events
            .emit(&PipelineEvent::ReadingAccepted(reading.clone()));

        match self.journal.record(reading) {
            Ok(RecordOutcome::Logged(entry) | RecordOutcome::Suppressed(entry)) => {
                self.events.emit(&PipelineEvent::EntryLogged(entry));
            }
            Ok(RecordOutcome::SameSecond) => {}
            Err(e) => self.storage_failed(e),
        }

        let voltage = reading.voltage();
        if voltage.is_dangerous() {
            if self.last_alerted != Some(voltage) {
                self.last_alerted = Some(voltage);
                self.raise(voltage);
            }
        } else {
            self.last_alerted = None;
        }
    }

    fn on_reading_cleared(&mut self) {
        self.current = None;
        self.last_alerted = None;
        self.journal.reset_duplicate_filter();
        if self.alerts.stop_all() {
            self.events.emit(&PipelineEvent::AlertsStopped);
        }
        self.events.emit(&PipelineEvent::ReadingLost);
    }

    fn on_state_changed(&mut self, state: ConnectionState) {
        self.link_state = state;
        self.events.emit(&PipelineEvent::LinkStateChanged(state));
    }
}

/// Lets the manager task and an operator task share one observer on a
/// single-threaded executor.
impl<O: LinkObserver> LinkObserver for Rc<RefCell<O>> {
    fn on_reading(&mut self, reading: &Reading) {
        self.borrow_mut().on_reading(reading);
    }

    fn on_reading_cleared(&mut self) {
        self.borrow_mut().on_reading_cleared();
    }

    fn on_state_changed(&mut self, state: ConnectionState) {
        self.borrow_mut().on_state_changed(state);
    }
}
