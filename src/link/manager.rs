//! Connection manager task.
//!
//! The only owner of the [`LinkMachine`] and the live transport session.
//! One loop, one task:
//!
//! 1. fire due timers,
//! 2. wait for the next bus event or the next deadline, whichever is first,
//! 3. feed the machine and execute the actions it returns.
//!
//! Transport results re-enter the machine as follow-up events before the
//! next bus event is taken, so a reading's timeout is always cancelled
//! before the next one is armed.  Suspending calls (connect, disconnect,
//! poll read) are each bounded by a reactor timer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::alert::AlertCoordinator;
use crate::app::ports::{Clock, KeyValueStore, LinkObserver, Transport, TransportSession};
use crate::config::LinkConfig;
use crate::error::{ConfigError, TransportError};

use super::bus::LinkBus;
use super::machine::LinkMachine;
use super::{Action, DeviceId, LAST_DEVICE_KEY, LinkEvent, LinkSnapshot};

/// Race `fut` against a reactor timer.
async fn bounded<T>(
    ms: u64,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    futures_lite::future::or(fut, async move {
        async_io_mini::Timer::after(Duration::from_millis(ms)).await;
        Err(TransportError::Timeout)
    })
    .await
}

pub struct ConnectionManager<T: Transport, K: KeyValueStore, C: Clock> {
    machine: LinkMachine,
    transport: T,
    session: Option<T::Session>,
    store: K,
    clock: C,
    alerts: Arc<AlertCoordinator>,
}

impl<T: Transport, K: KeyValueStore, C: Clock> ConnectionManager<T, K, C> {
    pub fn new(
        cfg: &LinkConfig,
        transport: T,
        store: K,
        clock: C,
        alerts: Arc<AlertCoordinator>,
    ) -> Result<Self, ConfigError> {
        let mut machine = LinkMachine::new(cfg)?;
        let preferred = store.get(LAST_DEVICE_KEY).map(DeviceId);
        if let Some(id) = &preferred {
            info!("link: last known device {}", id);
        }
        machine.set_preferred(preferred);
        Ok(Self {
            machine,
            transport,
            session: None,
            store,
            clock,
            alerts,
        })
    }

    /// Run until a [`LinkEvent::Shutdown`] is received.
    pub async fn run<O: LinkObserver>(&mut self, bus: &LinkBus, observer: &mut O) {
        info!("link: manager started ({:?} mode)", self.machine.config().mode);
        bus.publish(self.machine.snapshot());

        loop {
            let due = self.machine.on_timers(self.clock.now());
            if !due.is_empty() {
                self.process(due, observer).await;
                bus.publish(self.machine.snapshot());
            }

            let event = match self.machine.next_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_sub(self.clock.now().mono_ms);
                    futures_lite::future::or(async { Some(bus.receive().await) }, async move {
                        async_io_mini::Timer::after(Duration::from_millis(wait)).await;
                        None
                    })
                    .await
                }
                None => Some(bus.receive().await),
            };
            let Some(event) = event else {
                continue;
            };

            let shutdown = event == LinkEvent::Shutdown;
            let actions = self.machine.handle(event, self.clock.now());
            self.process(actions, observer).await;
            bus.publish(self.machine.snapshot());

            if shutdown {
                info!("link: manager stopped");
                break;
            }
        }
    }

    /// Execute `actions`, then feed every follow-up event back into the
    /// machine until none remain.
    async fn process<O: LinkObserver>(&mut self, actions: Vec<Action>, observer: &mut O) {
        let mut follow_ups = VecDeque::new();
        self.execute_all(actions, &mut follow_ups, observer).await;
        while let Some(event) = follow_ups.pop_front() {
            let actions = self.machine.handle(event, self.clock.now());
            self.execute_all(actions, &mut follow_ups, observer).await;
        }
    }

    async fn execute_all<O: LinkObserver>(
        &mut self,
        actions: Vec<Action>,
        follow_ups: &mut VecDeque<LinkEvent>,
        observer: &mut O,
    ) {
        for action in actions {
            if let Some(event) = self.execute(action, observer).await {
                follow_ups.push_back(event);
            }
        }
    }

    async fn execute<O: LinkObserver>(
        &mut self,
        action: Action,
        observer: &mut O,
    ) -> Option<LinkEvent> {
        let characteristic = self.machine.filter().characteristic;
        let cfg = self.machine.config();
        let (connect_ms, disconnect_ms, read_ms) = (
            cfg.connect_timeout_ms,
            cfg.disconnect_timeout_ms,
            cfg.reading_timeout_ms,
        );

        match action {
            Action::StartScan => match self.transport.start_scan(self.machine.filter()).await {
                Ok(()) => None,
                Err(e) => Some(LinkEvent::ScanFailed(e)),
            },
            Action::StopScan => {
                if let Err(e) = self.transport.stop_scan().await {
                    warn!("link: stop_scan failed: {}", e);
                }
                None
            }
            Action::Connect(id) => {
                match bounded(connect_ms, self.transport.connect(&id)).await {
                    Ok(session) => {
                        if let Some(mut stale) = self.session.replace(session) {
                            if let Err(e) = bounded(disconnect_ms, stale.disconnect()).await {
                                warn!("link: stale session did not disconnect cleanly: {}", e);
                            }
                        }
                        Some(LinkEvent::ConnectSucceeded(id))
                    }
                    Err(e) => Some(LinkEvent::ConnectFailed(id, e)),
                }
            }
            Action::Subscribe => {
                let session = self.session.as_mut()?;
                match bounded(connect_ms, session.subscribe(characteristic)).await {
                    Ok(()) => Some(LinkEvent::Subscribed),
                    Err(e) => Some(LinkEvent::SubscribeFailed(e)),
                }
            }
            Action::Poll => {
                let session = self.session.as_mut()?;
                let result = bounded(read_ms, session.read(characteristic)).await;
                if matches!(result, Err(TransportError::Disconnected)) {
                    return Some(LinkEvent::Dropped);
                }
                Some(LinkEvent::PollResult(result))
            }
            Action::Disconnect => {
                let mut session = self.session.take()?;
                if let Err(e) = bounded(disconnect_ms, session.disconnect()).await {
                    warn!("link: disconnect did not complete cleanly: {}", e);
                }
                None
            }
            Action::RememberDevice(id) => {
                if let Err(e) = self.store.put(LAST_DEVICE_KEY, &id.0) {
                    warn!("link: could not remember {}: {}", id, e);
                }
                None
            }
            Action::Deliver(reading) => {
                debug!("link: reading {} #{}", reading.voltage(), reading.sequence_number());
                observer.on_reading(&reading);
                None
            }
            Action::ReadingCleared => {
                observer.on_reading_cleared();
                None
            }
            Action::StopAlerts => {
                self.alerts.stop_all();
                None
            }
            Action::StateChanged(state) => {
                info!("link: state {}", state);
                observer.on_state_changed(state);
                None
            }
        }
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        self.machine.snapshot()
    }

    pub fn machine(&self) -> &LinkMachine {
        &self.machine
    }

    /// Link debug trail, oldest first.
    pub fn trail(&self) -> Vec<String> {
        self.machine.trail_lines()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}
