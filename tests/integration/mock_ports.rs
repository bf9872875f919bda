//! Recording mock adapters for integration tests.
//!
//! Every mock records what was asked of it so tests can assert on the full
//! call history without a radio, a speaker or a database.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use voltsentry::adapters::memory_log::MemoryLogSink;
use voltsentry::alert::ChannelKind;
use voltsentry::app::events::PipelineEvent;
use voltsentry::app::ports::{
    AlertChannel, Clock, EventSink, LinkObserver, LogSink, Moment, Transport, TransportSession,
    WakeLock,
};
use voltsentry::error::{ResourceError, StorageError, TransportError};
use voltsentry::journal::LogEntry;
use voltsentry::link::bus::LinkBus;
use voltsentry::link::{ConnectionState, DeviceId, LinkEvent, ScanFilter};
use voltsentry::protocol::{Reading, VoltageLevel};

// ── Clock ─────────────────────────────────────────────────────

/// Clock that only moves when told to.
pub struct ManualClock {
    mono_ms: Cell<u64>,
    base: NaiveDateTime,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            mono_ms: Cell::new(0),
            base: NaiveDate::from_ymd_opt(2026, 6, 15)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
        }
    }

    pub fn advance(&self, ms: u64) -> Moment {
        self.mono_ms.set(self.mono_ms.get() + ms);
        self.now()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Moment {
        let ms = self.mono_ms.get();
        Moment {
            mono_ms: ms,
            wall: self.base + chrono::Duration::milliseconds(ms as i64),
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingEvents {
    pub events: Vec<PipelineEvent>,
}

#[allow(dead_code)]
impl RecordingEvents {
    pub fn count(&self, pred: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&mut self, event: &PipelineEvent) {
        self.events.push(event.clone());
    }
}

// ── Log sink that can be told to fail ─────────────────────────

#[derive(Default)]
pub struct FlakyLogSink {
    pub inner: MemoryLogSink,
    pub fail_inserts: bool,
}

impl LogSink for FlakyLogSink {
    fn insert(&mut self, entry: LogEntry) -> Result<(), StorageError> {
        if self.fail_inserts {
            return Err(StorageError::Full);
        }
        self.inner.insert(entry)
    }

    fn query_visible(&self) -> Result<Vec<LogEntry>, StorageError> {
        self.inner.query_visible()
    }

    fn count(&self) -> Result<usize, StorageError> {
        self.inner.count()
    }

    fn delete_oldest(&mut self) -> Result<(), StorageError> {
        self.inner.delete_oldest()
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        self.inner.clear_all()
    }
}

// ── Alert outputs ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Start(ChannelKind, VoltageLevel),
    Stop(ChannelKind),
    Retarget(ChannelKind, VoltageLevel),
    Acquire(Duration),
    Release,
}

pub type CallLog = Arc<Mutex<Vec<ChannelCall>>>;

pub struct MockChannel {
    kind: ChannelKind,
    running: bool,
    available: bool,
    log: CallLog,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new(kind: ChannelKind, log: &CallLog) -> Self {
        Self {
            kind,
            running: false,
            available: true,
            log: log.clone(),
        }
    }

    pub fn unavailable(kind: ChannelKind, log: &CallLog) -> Self {
        Self {
            available: false,
            ..Self::new(kind, log)
        }
    }
}

impl AlertChannel for MockChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn start(&mut self, voltage: VoltageLevel) -> Result<(), ResourceError> {
        if !self.available {
            return Err(ResourceError::Unavailable("mock"));
        }
        self.log
            .lock()
            .unwrap()
            .push(ChannelCall::Start(self.kind, voltage));
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().push(ChannelCall::Stop(self.kind));
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn retarget(&mut self, voltage: VoltageLevel) {
        self.log
            .lock()
            .unwrap()
            .push(ChannelCall::Retarget(self.kind, voltage));
    }
}

pub struct MockWake {
    held: bool,
    log: CallLog,
}

impl MockWake {
    pub fn new(log: &CallLog) -> Self {
        Self {
            held: false,
            log: log.clone(),
        }
    }
}

impl WakeLock for MockWake {
    fn acquire(&mut self, ceiling: Duration) -> Result<(), ResourceError> {
        self.log.lock().unwrap().push(ChannelCall::Acquire(ceiling));
        self.held = true;
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().unwrap().push(ChannelCall::Release);
        self.held = false;
    }

    fn is_held(&self) -> bool {
        self.held
    }
}

/// Audible, haptic and visual mocks sharing one call log.
pub fn mock_outputs(log: &CallLog) -> Vec<Box<dyn AlertChannel>> {
    [ChannelKind::Audible, ChannelKind::Haptic, ChannelKind::Visual]
        .into_iter()
        .map(|k| Box::new(MockChannel::new(k, log)) as Box<dyn AlertChannel>)
        .collect()
}

#[allow(dead_code)]
pub fn starts(log: &CallLog) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, ChannelCall::Start(..)))
        .count()
}

// ── Link observer ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingObserver {
    pub readings: Vec<Reading>,
    pub cleared: usize,
    pub states: Vec<ConnectionState>,
}

impl LinkObserver for RecordingObserver {
    fn on_reading(&mut self, reading: &Reading) {
        self.readings.push(reading.clone());
    }

    fn on_reading_cleared(&mut self) {
        self.cleared += 1;
    }

    fn on_state_changed(&mut self, state: ConnectionState) {
        self.states.push(state);
    }
}

// ── Transport ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Subscribe,
    Read,
    Disconnect,
}

pub type TransportLog = Rc<RefCell<Vec<TransportCall>>>;

/// Transport whose connect results and post-subscribe events are scripted.
pub struct ScriptedTransport {
    pub log: TransportLog,
    bus: Arc<LinkBus>,
    connect_results: VecDeque<Result<(), TransportError>>,
    on_subscribe: Vec<LinkEvent>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(bus: Arc<LinkBus>) -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            bus,
            connect_results: VecDeque::new(),
            on_subscribe: Vec::new(),
        }
    }

    /// Results for successive connect calls; once drained, connects succeed.
    pub fn with_connect_results(mut self, results: Vec<Result<(), TransportError>>) -> Self {
        self.connect_results = results.into();
        self
    }

    /// Events the sensor posts once notifications are armed.
    pub fn on_subscribe(mut self, events: Vec<LinkEvent>) -> Self {
        self.on_subscribe = events;
        self
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.log.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn start_scan(&mut self, _filter: &ScanFilter) -> Result<(), TransportError> {
        self.log.borrow_mut().push(TransportCall::StartScan);
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.log.borrow_mut().push(TransportCall::StopScan);
        Ok(())
    }

    async fn connect(&mut self, device: &DeviceId) -> Result<ScriptedSession, TransportError> {
        self.log
            .borrow_mut()
            .push(TransportCall::Connect(device.clone()));
        self.connect_results.pop_front().unwrap_or(Ok(()))?;
        Ok(ScriptedSession {
            log: self.log.clone(),
            bus: self.bus.clone(),
            on_subscribe: std::mem::take(&mut self.on_subscribe),
        })
    }
}

pub struct ScriptedSession {
    log: TransportLog,
    bus: Arc<LinkBus>,
    on_subscribe: Vec<LinkEvent>,
}

impl TransportSession for ScriptedSession {
    async fn subscribe(&mut self, _characteristic: u128) -> Result<(), TransportError> {
        self.log.borrow_mut().push(TransportCall::Subscribe);
        for event in self.on_subscribe.drain(..) {
            self.bus.post(event);
        }
        Ok(())
    }

    async fn read(&mut self, _characteristic: u128) -> Result<Vec<u8>, TransportError> {
        self.log.borrow_mut().push(TransportCall::Read);
        Err(TransportError::ReadFailed)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.log.borrow_mut().push(TransportCall::Disconnect);
        Ok(())
    }
}
