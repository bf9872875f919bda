//! Alert output patterns.
//!
//! | Output  | Pattern                                        |
//! |---------|------------------------------------------------|
//! | Siren   | 1200 Hz / 800 Hz alternating, 500 ms each      |
//! | Haptic  | off/on timings 0,500,200,500,200,500,800 ms    |
//!
//! Both loop until stopped.  Generators are pure so channel adapters can
//! render them however their backend wants (PCM buffer, vibrator API,
//! log lines).

use core::f32::consts::TAU;

/// Continuous two-tone siren.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirenPattern {
    pub high_hz: u32,
    pub low_hz: u32,
    pub segment_ms: u32,
    pub sample_rate: u32,
    pub amplitude: f32,
}

impl Default for SirenPattern {
    fn default() -> Self {
        Self {
            high_hz: 1200,
            low_hz: 800,
            segment_ms: 500,
            sample_rate: 44_100,
            amplitude: 0.8,
        }
    }
}

impl SirenPattern {
    /// Tone playing `elapsed_ms` after start.
    pub fn frequency_at(&self, elapsed_ms: u64) -> u32 {
        if (elapsed_ms / u64::from(self.segment_ms)) % 2 == 0 {
            self.high_hz
        } else {
            self.low_hz
        }
    }

    pub fn samples_per_segment(&self) -> usize {
        (self.sample_rate as usize * self.segment_ms as usize) / 1000
    }

    /// One full period (high segment then low segment) of 16-bit PCM.
    pub fn render_cycle(&self) -> Vec<i16> {
        let n = self.samples_per_segment();
        let rate = self.sample_rate as f32;
        let peak = f32::from(i16::MAX) * self.amplitude.clamp(0.0, 1.0);

        let mut out = Vec::with_capacity(n * 2);
        for hz in [self.high_hz, self.low_hz] {
            let step = TAU * hz as f32 / rate;
            out.extend((0..n).map(|i| ((step * i as f32).sin() * peak) as i16));
        }
        out
    }
}

/// Vibrate waveform: alternating off/on durations in milliseconds,
/// starting with "off".
pub const HAPTIC_TIMINGS_MS: [u64; 7] = [0, 500, 200, 500, 200, 500, 800];

/// Index the waveform loops back to.
pub const HAPTIC_REPEAT_INDEX: usize = 0;

/// Looping vibrate/pause waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticPattern {
    pub timings_ms: &'static [u64],
    pub repeat: usize,
}

impl Default for HapticPattern {
    fn default() -> Self {
        Self {
            timings_ms: &HAPTIC_TIMINGS_MS,
            repeat: HAPTIC_REPEAT_INDEX,
        }
    }
}

impl HapticPattern {
    /// Whether the motor is on `elapsed_ms` after start.
    pub fn is_on_at(&self, elapsed_ms: u64) -> bool {
        let head: u64 = self.timings_ms[..self.repeat].iter().sum();
        let cycle: u64 = self.timings_ms[self.repeat..].iter().sum();

        let mut t = elapsed_ms;
        let mut idx = 0;
        if t >= head {
            if cycle == 0 {
                return false;
            }
            t = (t - head) % cycle;
            idx = self.repeat;
        }
        for (i, d) in self.timings_ms.iter().enumerate().skip(idx) {
            if t < *d {
                return i % 2 == 1;
            }
            t -= d;
        }
        false
    }

    pub fn cycle_ms(&self) -> u64 {
        self.timings_ms[self.repeat..].iter().sum()
    }
}
