//! Link state machine.
//!
//! Pure, synchronous, clock-injected.  Every input is a [`LinkEvent`] or
//! the passage of time; every output is a list of [`Action`]s for the
//! manager to execute.  All timers live here as deadlines:
//!
//! | Timer    | Armed while                         | On expiry                     |
//! |----------|-------------------------------------|-------------------------------|
//! | timeout  | a reading is current                | clear reading, stop alerts    |
//! | settle   | scanning, first candidate seen      | connect to best candidate     |
//! | retry    | connecting, attempt failed          | reconnect same candidate      |
//! | poll     | session open                        | read characteristic           |
//! | watchdog | session open                        | re-arm notifications if quiet |
//! | rescan   | disconnected after unplanned drop   | resume scanning               |
//!
//! Session timers belong to [`SessionTimers`], which is dropped whenever
//! the session ends, so no poll or watchdog can outlive its session.

use log::{debug, info, warn};

use crate::app::ports::Moment;
use crate::config::{LinkConfig, LinkMode};
use crate::error::{ConfigError, DecodeError, TransportError};
use crate::protocol::{PacketDecoder, PayloadSource, Reading};

use super::scan::{CandidateSet, ScanFilter};
use super::timeout::ReadingTimeout;
use super::trail::DebugTrail;
use super::{Action, ConnectionState, DeviceId, LinkEvent, LinkSnapshot, ScannedDevice};

const STATUS_SCANNING: &str = "Scanning...";
const STATUS_CONNECTING: &str = "Connecting...";
const STATUS_MONITORING: &str = "Monitoring";
const STATUS_RECONNECTING: &str = "Reconnecting...";
const STATUS_FAILED: &str = "Connection failed";

/// Ordered candidates for one connection cycle.
#[derive(Debug, Clone)]
struct ConnectPlan {
    devices: Vec<DeviceId>,
    index: usize,
    tries: u32,
}

impl ConnectPlan {
    fn current(&self) -> Option<&DeviceId> {
        self.devices.get(self.index)
    }
}

/// Timers and counters scoped to one open session.
#[derive(Debug, Clone)]
struct SessionTimers {
    poll_due: u64,
    watchdog_due: u64,
    last_reading_ms: u64,
    last_notify_ms: Option<u64>,
    poll_failures: u32,
}

pub struct LinkMachine {
    cfg: LinkConfig,
    filter: ScanFilter,
    decoder: PacketDecoder,

    state: ConnectionState,
    candidates: CandidateSet,
    preferred: Option<DeviceId>,
    device: Option<DeviceId>,
    plan: Option<ConnectPlan>,
    session: Option<SessionTimers>,
    latest: Option<Reading>,

    timeout: ReadingTimeout,
    settle_due: Option<u64>,
    retry_due: Option<u64>,
    rescan_due: Option<u64>,

    error_count: u32,
    failed_cycles: u32,
    status: Option<&'static str>,
    trail: DebugTrail,
}

impl LinkMachine {
    pub fn new(cfg: &LinkConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            filter: ScanFilter::from_config(cfg)?,
            decoder: PacketDecoder::new(cfg.advertisement_policy),
            timeout: ReadingTimeout::new(cfg.reading_timeout_ms),
            cfg: cfg.clone(),

            state: ConnectionState::Disconnected,
            candidates: CandidateSet::new(),
            preferred: None,
            device: None,
            plan: None,
            session: None,
            latest: None,

            settle_due: None,
            retry_due: None,
            rescan_due: None,

            error_count: 0,
            failed_cycles: 0,
            status: None,
            trail: DebugTrail::new(),
        })
    }

    /// Device to try first on the next connection cycle.
    pub fn set_preferred(&mut self, device: Option<DeviceId>) {
        self.preferred = device;
    }

    // ── Event dispatch ────────────────────────────────────────

    pub fn handle(&mut self, event: LinkEvent, now: Moment) -> Vec<Action> {
        let mut out = Vec::new();
        match event {
            LinkEvent::StartScan => self.on_start_scan(now, &mut out),
            LinkEvent::Stop | LinkEvent::Shutdown => self.on_stop(now, &mut out),
            LinkEvent::Select(id) => self.on_select(id, now, &mut out),
            LinkEvent::Advertisement { device, payload } => {
                self.on_advertisement(device, &payload, now, &mut out);
            }
            LinkEvent::ScanFailed(e) => self.on_scan_failed(e, now, &mut out),
            LinkEvent::ConnectSucceeded(id) => self.on_connected(id, now, &mut out),
            LinkEvent::ConnectFailed(id, e) => self.on_connect_failed(&id, e, now, &mut out),
            LinkEvent::Subscribed => self.trail.push(now.wall, "notifications armed"),
            LinkEvent::SubscribeFailed(e) => {
                self.error_count += 1;
                warn!("link: subscribe failed: {}", e);
                self.trail.push(now.wall, format_args!("subscribe failed: {e}"));
            }
            LinkEvent::Notification(bytes) => self.on_notification(&bytes, now, &mut out),
            LinkEvent::PollResult(result) => self.on_poll_result(result, now, &mut out),
            LinkEvent::Dropped => {
                if self.session.is_some() {
                    warn!("link: session dropped by remote");
                    self.trail.push(now.wall, "session dropped");
                    self.enter_disconnected(false, now, &mut out);
                }
            }
        }
        out
    }

    /// Fire every timer whose deadline has passed.
    pub fn on_timers(&mut self, now: Moment) -> Vec<Action> {
        let mut out = Vec::new();
        let t = now.mono_ms;

        if self.timeout.poll(t) {
            self.on_reading_lost(now, &mut out);
        }

        if self.retry_due.is_some_and(|d| t >= d) {
            self.retry_due = None;
            if let Some(id) = self.plan.as_ref().and_then(ConnectPlan::current) {
                out.push(Action::Connect(id.clone()));
            }
        }

        if self.settle_due.is_some_and(|d| t >= d) {
            self.settle_due = None;
            if self.state == ConnectionState::Scanning && self.plan.is_none() {
                let devices = self.candidates.ranked(self.preferred.as_ref());
                self.begin_connect(devices, now, &mut out);
            }
        }

        if let Some(s) = self.session.as_mut() {
            if t >= s.watchdog_due {
                s.watchdog_due = t + self.cfg.watchdog_interval_ms;
                let quiet_for = t.saturating_sub(s.last_reading_ms);
                if quiet_for > self.cfg.watchdog_interval_ms {
                    warn!("link: no reading for {} ms, re-arming notifications", quiet_for);
                    self.trail
                        .push(now.wall, format_args!("watchdog: quiet {quiet_for} ms"));
                    out.push(Action::Subscribe);
                    s.poll_due = t + self.cfg.poll_interval_ms;
                    s.poll_failures = 0;
                }
            }
            if t >= s.poll_due {
                s.poll_due = t + self.cfg.poll_interval_ms;
                out.push(Action::Poll);
            }
        }

        if self.rescan_due.is_some_and(|d| t >= d) {
            self.rescan_due = None;
            if self.state == ConnectionState::Disconnected {
                info!("link: resuming scan");
                self.enter_scanning(now, &mut out);
            }
        }

        out
    }

    // ── Operator requests ─────────────────────────────────────

    fn on_start_scan(&mut self, now: Moment, out: &mut Vec<Action>) {
        if self.state != ConnectionState::Disconnected {
            warn!("link: start_scan ignored in {}", self.state);
            return;
        }
        self.failed_cycles = 0;
        self.rescan_due = None;
        self.enter_scanning(now, out);
    }

    fn on_stop(&mut self, now: Moment, out: &mut Vec<Action>) {
        if self.state == ConnectionState::Disconnected {
            self.rescan_due = None;
            self.status = None;
            return;
        }
        info!("link: stop requested");
        self.trail.push(now.wall, "stop requested");
        self.enter_disconnected(true, now, out);
    }

    fn on_select(&mut self, id: DeviceId, now: Moment, out: &mut Vec<Action>) {
        if self.state != ConnectionState::Scanning {
            warn!("link: select {} ignored in {}", id, self.state);
            return;
        }
        if !self.candidates.contains(&id) {
            warn!("link: select {} ignored, not discovered", id);
            return;
        }
        self.begin_connect(vec![id], now, out);
    }

    // ── Radio input ───────────────────────────────────────────

    fn on_advertisement(
        &mut self,
        device: ScannedDevice,
        payload: &[u8],
        now: Moment,
        out: &mut Vec<Action>,
    ) {
        if self.state == ConnectionState::Disconnected || !self.filter.matches(&device) {
            return;
        }

        let id = device.id.clone();
        if self.state == ConnectionState::Scanning && self.candidates.upsert(device) {
            debug!("link: candidate {}", id);
            self.trail.push(now.wall, format_args!("candidate {id}"));
        }

        if !payload.is_empty() {
            if let Ok(reading) = self.decoder.decode(payload, PayloadSource::Advertisement, now.wall) {
                if self.cfg.mode == LinkMode::Broadcast
                    && self.state == ConnectionState::Scanning
                {
                    self.set_state(ConnectionState::Connecting, out);
                    self.device = Some(id.clone());
                    self.set_state(ConnectionState::Connected, out);
                }
                self.deliver(reading, now, out);
            }
        }

        if self.cfg.mode == LinkMode::Session
            && self.state == ConnectionState::Scanning
            && self.plan.is_none()
        {
            if self.preferred.as_ref() == Some(&id) {
                let devices = self.candidates.ranked(self.preferred.as_ref());
                self.begin_connect(devices, now, out);
            } else if self.settle_due.is_none() {
                self.settle_due = Some(now.mono_ms + self.cfg.scan_settle_ms);
            }
        }
    }

    fn on_scan_failed(&mut self, e: TransportError, now: Moment, out: &mut Vec<Action>) {
        self.error_count += 1;
        warn!("link: scan failed: {}", e);
        self.trail.push(now.wall, format_args!("scan failed: {e}"));
        if self.state == ConnectionState::Scanning {
            self.failed_cycles += 1;
            self.enter_disconnected(false, now, out);
        }
    }

    fn on_notification(&mut self, bytes: &[u8], now: Moment, out: &mut Vec<Action>) {
        let Some(s) = self.session.as_mut() else {
            return;
        };
        s.last_notify_ms = Some(now.mono_ms);
        self.ingest_session_payload(bytes, now, out);
    }

    fn on_poll_result(
        &mut self,
        result: Result<Vec<u8>, TransportError>,
        now: Moment,
        out: &mut Vec<Action>,
    ) {
        let Some(s) = self.session.as_mut() else {
            return;
        };
        match result {
            Ok(bytes) => {
                s.poll_failures = 0;
                if let Some(window) = self.cfg.stale_read_window_ms {
                    let fresh = s
                        .last_notify_ms
                        .is_some_and(|n| now.mono_ms.saturating_sub(n) <= window);
                    if !fresh {
                        debug!("link: stale poll result ignored");
                        return;
                    }
                }
                self.ingest_session_payload(&bytes, now, out);
            }
            Err(e) => {
                s.poll_failures += 1;
                debug!("link: poll failed ({}): {}", s.poll_failures, e);
                if s.poll_failures >= self.cfg.max_poll_failures {
                    s.poll_failures = 0;
                    warn!("link: {} poll failures, re-arming notifications", self.cfg.max_poll_failures);
                    self.trail.push(now.wall, "poll failing, re-subscribe");
                    out.push(Action::Subscribe);
                }
            }
        }
    }

    fn ingest_session_payload(&mut self, bytes: &[u8], now: Moment, out: &mut Vec<Action>) {
        match self.decoder.decode(bytes, PayloadSource::Session, now.wall) {
            Ok(reading) => self.deliver(reading, now, out),
            Err(e) => self.on_decode_error(e, now),
        }
    }

    fn on_decode_error(&mut self, e: DecodeError, now: Moment) {
        self.error_count += 1;
        self.trail.push(now.wall, format_args!("rejected: {e}"));
    }

    // ── Connection cycle ──────────────────────────────────────

    fn begin_connect(&mut self, devices: Vec<DeviceId>, now: Moment, out: &mut Vec<Action>) {
        let Some(first) = devices.first().cloned() else {
            return;
        };
        self.settle_due = None;
        self.plan = Some(ConnectPlan {
            devices,
            index: 0,
            tries: 0,
        });
        out.push(Action::StopScan);
        self.set_state(ConnectionState::Connecting, out);
        self.status = Some(STATUS_CONNECTING);
        info!("link: connecting to {}", first);
        self.trail.push(now.wall, format_args!("connect {first}"));
        out.push(Action::Connect(first));
    }

    fn on_connected(&mut self, id: DeviceId, now: Moment, out: &mut Vec<Action>) {
        let expected = self.plan.as_ref().and_then(ConnectPlan::current);
        if self.state != ConnectionState::Connecting || expected != Some(&id) {
            warn!("link: late session for {} released", id);
            out.push(Action::Disconnect);
            return;
        }

        self.plan = None;
        self.retry_due = None;
        self.failed_cycles = 0;
        self.preferred = Some(id.clone());
        self.device = Some(id.clone());
        self.session = Some(SessionTimers {
            poll_due: now.mono_ms + self.cfg.poll_interval_ms,
            watchdog_due: now.mono_ms + self.cfg.watchdog_interval_ms,
            last_reading_ms: now.mono_ms,
            last_notify_ms: None,
            poll_failures: 0,
        });

        info!("link: connected to {}", id);
        self.trail.push(now.wall, format_args!("connected {id}"));
        self.set_state(ConnectionState::Connected, out);
        self.status = Some(STATUS_MONITORING);
        out.push(Action::RememberDevice(id));
        out.push(Action::Subscribe);
    }

    fn on_connect_failed(
        &mut self,
        id: &DeviceId,
        e: TransportError,
        now: Moment,
        out: &mut Vec<Action>,
    ) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        plan.tries += 1;
        warn!("link: connect {} failed ({}/{}): {}", id, plan.tries, self.cfg.connect_attempts, e);
        self.trail.push(now.wall, format_args!("connect {id} failed: {e}"));

        if plan.tries < self.cfg.connect_attempts {
            self.retry_due = Some(now.mono_ms + self.cfg.retry_delay_ms);
            return;
        }

        self.error_count += 1;
        plan.index += 1;
        plan.tries = 0;
        if let Some(next) = plan.current().cloned() {
            info!("link: trying next candidate {}", next);
            out.push(Action::Connect(next));
        } else {
            self.failed_cycles += 1;
            self.enter_disconnected(false, now, out);
        }
    }

    // ── Readings ──────────────────────────────────────────────

    fn deliver(&mut self, reading: Reading, now: Moment, out: &mut Vec<Action>) {
        self.error_count = 0;
        self.timeout.arm(now.mono_ms);
        if let Some(s) = self.session.as_mut() {
            s.last_reading_ms = now.mono_ms;
        }
        if self.state == ConnectionState::Connected {
            self.status = Some(STATUS_MONITORING);
        }
        self.latest = Some(reading.clone());
        out.push(Action::Deliver(reading));
    }

    fn on_reading_lost(&mut self, now: Moment, out: &mut Vec<Action>) {
        info!("link: reading timed out");
        self.trail.push(now.wall, "reading timeout");
        self.latest = None;
        out.push(Action::ReadingCleared);
        out.push(Action::StopAlerts);

        if self.cfg.mode == LinkMode::Broadcast && self.state == ConnectionState::Connected {
            self.device = None;
            self.set_state(ConnectionState::Scanning, out);
            self.status = Some(STATUS_SCANNING);
        }
    }

    // ── State entry ───────────────────────────────────────────

    fn enter_scanning(&mut self, now: Moment, out: &mut Vec<Action>) {
        self.candidates.clear();
        self.settle_due = None;
        self.trail.push(now.wall, "scan started");
        out.push(Action::StartScan);
        self.set_state(ConnectionState::Scanning, out);
        self.status = Some(STATUS_SCANNING);
    }

    fn enter_disconnected(&mut self, deliberate: bool, now: Moment, out: &mut Vec<Action>) {
        let prev = self.state;
        if prev == ConnectionState::Scanning
            || (self.cfg.mode == LinkMode::Broadcast && prev != ConnectionState::Disconnected)
        {
            out.push(Action::StopScan);
        }
        if self.session.take().is_some() {
            out.push(Action::Disconnect);
        }

        self.plan = None;
        self.device = None;
        self.timeout.cancel();
        self.settle_due = None;
        self.retry_due = None;
        self.rescan_due = None;

        if self.latest.take().is_some() {
            out.push(Action::ReadingCleared);
        }
        out.push(Action::StopAlerts);
        self.set_state(ConnectionState::Disconnected, out);

        if deliberate {
            self.status = None;
        } else if self.failed_cycles < self.cfg.max_failed_cycles {
            self.rescan_due = Some(now.mono_ms + self.cfg.rescan_delay_ms);
            self.status = Some(STATUS_RECONNECTING);
        } else {
            warn!("link: {} failed cycles, giving up until restarted", self.failed_cycles);
            self.status = Some(STATUS_FAILED);
        }
        self.trail.push(now.wall, format_args!("disconnected (from {prev})"));
    }

    fn set_state(&mut self, next: ConnectionState, out: &mut Vec<Action>) {
        if self.state != next {
            debug!("link: {} -> {}", self.state, next);
            self.state = next;
            out.push(Action::StateChanged(next));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    pub fn filter(&self) -> &ScanFilter {
        &self.filter
    }

    pub fn config(&self) -> &LinkConfig {
        &self.cfg
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        let session = self
            .session
            .as_ref()
            .map(|s| s.poll_due.min(s.watchdog_due));
        [
            self.timeout.deadline(),
            self.settle_due,
            self.retry_due,
            self.rescan_due,
            session,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        let singles = [
            self.timeout.deadline(),
            self.settle_due,
            self.retry_due,
            self.rescan_due,
        ]
        .iter()
        .filter(|d| d.is_some())
        .count();
        singles + self.session_timers()
    }

    /// Poll and watchdog timers of the open session.
    pub fn session_timers(&self) -> usize {
        if self.session.is_some() { 2 } else { 0 }
    }

    pub fn trail_lines(&self) -> Vec<String> {
        self.trail.lines()
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            state: self.state,
            error_count: self.error_count,
            status: self.status,
            latest: self.latest.clone(),
            device: self.device.clone(),
            candidates: self.candidates.devices().to_vec(),
        }
    }
}
