//! Transport state and controls

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Master ticks per quarter note (one tick is a 16th)
pub const TICKS_PER_BEAT: u64 = 4;

pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() { DEFAULT_BPM } else { bpm.clamp(MIN_BPM, MAX_BPM) }
}

/// Tempo, run state and the master tick counter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    /// Tempo in BPM
    pub bpm: f64,
    pub playing: bool,
    /// Ticks elapsed since the last reset
    pub master_tick: u64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            playing: false,
            master_tick: 0,
        }
    }
}

impl Transport {
    pub fn with_bpm(&self, bpm: f64) -> Self {
        Self { bpm: clamp_bpm(bpm), ..*self }
    }

    pub fn with_playing(&self, playing: bool) -> Self {
        Self { playing, ..*self }
    }

    pub fn advanced(&self) -> Self {
        Self { master_tick: self.master_tick + 1, ..*self }
    }

    pub fn rewound(&self) -> Self {
        Self { master_tick: 0, ..*self }
    }

    /// Seconds between master ticks at the current tempo
    pub fn step_secs(&self) -> f64 {
        60.0 / clamp_bpm(self.bpm) / TICKS_PER_BEAT as f64
    }

    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f64(self.step_secs())
    }
}
