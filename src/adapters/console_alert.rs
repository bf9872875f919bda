//! Console alert outputs.
//!
//! Host stand-ins for the speaker, vibrator, screen and wake resource.
//! Each renders its pattern as log lines so a headless run shows exactly
//! what a device would present.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::alert::ChannelKind;
use crate::alert::patterns::{HapticPattern, SirenPattern};
use crate::app::ports::{AlertChannel, WakeLock};
use crate::error::ResourceError;
use crate::protocol::{Severity, VoltageLevel};

// ── Audible ──────────────────────────────────────────────────

pub struct ConsoleSiren {
    pattern: SirenPattern,
    since: Option<Instant>,
}

impl Default for ConsoleSiren {
    fn default() -> Self {
        Self::new(SirenPattern::default())
    }
}

impl ConsoleSiren {
    pub fn new(pattern: SirenPattern) -> Self {
        Self {
            pattern,
            since: None,
        }
    }

    /// Tone currently playing, if running.
    pub fn current_hz(&self) -> Option<u32> {
        self.since
            .map(|t| self.pattern.frequency_at(t.elapsed().as_millis() as u64))
    }
}

impl AlertChannel for ConsoleSiren {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Audible
    }

    fn start(&mut self, voltage: VoltageLevel) -> Result<(), ResourceError> {
        let pcm = self.pattern.render_cycle();
        if pcm.is_empty() {
            return Err(ResourceError::StartFailed("siren"));
        }
        info!(
            "SIREN | on | {} | {}/{} Hz every {} ms ({} samples/cycle)",
            voltage,
            self.pattern.high_hz,
            self.pattern.low_hz,
            self.pattern.segment_ms,
            pcm.len(),
        );
        self.since = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        if self.since.take().is_some() {
            info!("SIREN | off");
        }
    }

    fn is_running(&self) -> bool {
        self.since.is_some()
    }
}

// ── Haptic ───────────────────────────────────────────────────

#[derive(Default)]
pub struct ConsoleVibrator {
    pattern: HapticPattern,
    since: Option<Instant>,
}

impl ConsoleVibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn motor_on(&self) -> bool {
        self.since
            .is_some_and(|t| self.pattern.is_on_at(t.elapsed().as_millis() as u64))
    }
}

impl AlertChannel for ConsoleVibrator {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Haptic
    }

    fn start(&mut self, _voltage: VoltageLevel) -> Result<(), ResourceError> {
        info!(
            "HAPTIC | on | waveform={:?} ms repeat@{}",
            self.pattern.timings_ms, self.pattern.repeat
        );
        self.since = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        if self.since.take().is_some() {
            info!("HAPTIC | off");
        }
    }

    fn is_running(&self) -> bool {
        self.since.is_some()
    }
}

// ── Visual ───────────────────────────────────────────────────

/// Full-screen warning request.  Carries the level it shows.
#[derive(Default)]
pub struct ConsoleScreen {
    showing: Option<VoltageLevel>,
}

impl ConsoleScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn showing(&self) -> Option<VoltageLevel> {
        self.showing
    }

    fn present(&mut self, voltage: VoltageLevel) {
        let banner = match voltage.severity() {
            Severity::Danger => "DANGER",
            Severity::Caution => "CAUTION",
            Severity::Diagnostic => "DIAGNOSTIC",
        };
        warn!("SCREEN | {} | {} detected", banner, voltage);
        self.showing = Some(voltage);
    }
}

impl AlertChannel for ConsoleScreen {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Visual
    }

    fn start(&mut self, voltage: VoltageLevel) -> Result<(), ResourceError> {
        self.present(voltage);
        Ok(())
    }

    fn stop(&mut self) {
        if self.showing.take().is_some() {
            info!("SCREEN | dismissed");
        }
    }

    fn is_running(&self) -> bool {
        self.showing.is_some()
    }

    fn retarget(&mut self, voltage: VoltageLevel) {
        if self.showing != Some(voltage) {
            self.present(voltage);
        }
    }
}

// ── Wake resource ────────────────────────────────────────────

/// Keep-awake flag that lapses by itself at the ceiling.
#[derive(Default)]
pub struct ConsoleWakeLock {
    until: Option<Instant>,
}

impl ConsoleWakeLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WakeLock for ConsoleWakeLock {
    fn acquire(&mut self, ceiling: Duration) -> Result<(), ResourceError> {
        let until = Instant::now()
            .checked_add(ceiling)
            .ok_or(ResourceError::StartFailed("wake ceiling out of range"))?;
        info!("WAKE | held for at most {} s", ceiling.as_secs());
        self.until = Some(until);
        Ok(())
    }

    fn release(&mut self) {
        if self.until.take().is_some() {
            info!("WAKE | released");
        }
    }

    fn is_held(&self) -> bool {
        self.until.is_some_and(|t| Instant::now() < t)
    }
}

/// The default host output set, one per channel kind.
pub fn console_channels() -> Vec<Box<dyn AlertChannel>> {
    vec![
        Box::new(ConsoleSiren::default()),
        Box::new(ConsoleVibrator::new()),
        Box::new(ConsoleScreen::new()),
    ]
}
