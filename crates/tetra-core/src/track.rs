//! Tracks and their independently clocked subtracks

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::TetraError;

pub const MIN_LENGTH: usize = 1;
pub const MAX_LENGTH: usize = 64;
pub const DEFAULT_LENGTH: usize = 16;
pub const MIN_DIVIDER: u32 = 1;
pub const MAX_DIVIDER: u32 = 32;

pub const MIN_GATE_LENGTH: f32 = 0.05;
pub const MAX_GATE_LENGTH: f32 = 1.0;
pub const MAX_RATCHET: u8 = 4;
pub const MAX_SLIDE: f32 = 0.5;

pub fn clamp_length(length: usize) -> usize {
    length.clamp(MIN_LENGTH, MAX_LENGTH)
}

pub fn clamp_divider(divider: u32) -> u32 {
    divider.clamp(MIN_DIVIDER, MAX_DIVIDER)
}

/// Clamp to `[0.05, 1.0]` and snap to the 0.05 grid
pub fn quantize_gate_length(length: f32) -> f32 {
    let snapped = (length.clamp(MIN_GATE_LENGTH, MAX_GATE_LENGTH) * 20.0).round() / 20.0;
    snapped.clamp(MIN_GATE_LENGTH, MAX_GATE_LENGTH)
}

/// Compound gate data for one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateStep {
    pub on: bool,
    /// Fraction of the step the gate stays open
    pub length: f32,
    /// Sub-triggers within the step (1 = plain trigger)
    pub ratchet: u8,
}

impl Default for GateStep {
    fn default() -> Self {
        Self { on: false, length: 0.5, ratchet: 1 }
    }
}

/// Compound pitch data for one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchStep {
    pub note: u8,
    /// Portamento time in seconds, 0 = off
    pub slide: f32,
}

impl Default for PitchStep {
    fn default() -> Self {
        Self { note: 60, slide: 0.0 }
    }
}

pub const DEFAULT_VELOCITY: u8 = 100;
pub const DEFAULT_MOD: f32 = 0.0;

/// One parameter lane of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubtrackId {
    Gate,
    Pitch,
    Velocity,
    Mod,
}

impl SubtrackId {
    pub const ALL: [SubtrackId; 4] = [
        SubtrackId::Gate,
        SubtrackId::Pitch,
        SubtrackId::Velocity,
        SubtrackId::Mod,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gate => "gate",
            Self::Pitch => "pitch",
            Self::Velocity => "velocity",
            Self::Mod => "mod",
        }
    }
}

impl fmt::Display for SubtrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubtrackId {
    type Err = TetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TetraError::unknown("subtrack", s))
    }
}

/// A lane of steps with its own length, divider and playhead.
///
/// Step storage is shared copy-on-write, so clones are cheap and an
/// untouched lane keeps pointing at the same allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtrack<T> {
    pub steps: Arc<Vec<T>>,
    pub length: usize,
    pub clock_divider: u32,
    pub current_step: usize,
}

/// Output-level mute lane
pub type MuteTrack = Subtrack<bool>;

impl<T: Clone> Subtrack<T> {
    pub fn new(length: usize, fill: T) -> Self {
        let length = clamp_length(length);
        Self {
            steps: Arc::new(vec![fill; length]),
            length,
            clock_divider: 1,
            current_step: 0,
        }
    }

    pub fn step(&self, index: usize) -> Option<&T> {
        self.steps.get(index)
    }

    /// Value under the playhead
    pub fn current(&self) -> Option<&T> {
        self.steps.get(self.current_step)
    }

    /// Resize, padding with `fill` or truncating. The playhead wraps into range.
    pub fn with_length(&self, length: usize, fill: T) -> Self {
        let length = clamp_length(length);
        if length == self.length {
            return self.clone();
        }
        let mut steps = self.steps.as_ref().clone();
        steps.resize(length, fill);
        Self {
            steps: Arc::new(steps),
            length,
            clock_divider: self.clock_divider,
            current_step: self.current_step % length,
        }
    }

    pub fn with_clock_divider(&self, divider: u32) -> Self {
        Self { clock_divider: clamp_divider(divider), ..self.clone() }
    }

    /// Replace one step; out-of-range indices return an unchanged copy
    pub fn with_step(&self, index: usize, value: T) -> Self {
        self.update_step(index, |_| value)
    }

    pub fn update_step(&self, index: usize, f: impl FnOnce(&T) -> T) -> Self {
        let mut next = self.clone();
        if let Some(step) = Arc::make_mut(&mut next.steps).get_mut(index) {
            *step = f(step);
        }
        next
    }

    /// Rewrite every step; `f` receives the step index and the old value
    pub fn map_steps(&self, mut f: impl FnMut(usize, &T) -> T) -> Self {
        let steps = self.steps.iter().enumerate().map(|(i, s)| f(i, s)).collect();
        Self { steps: Arc::new(steps), ..self.clone() }
    }

    /// Playhead position at `master_tick` under the given track divider
    pub fn advanced_to(&self, master_tick: u64, track_divider: u32) -> Self {
        Self {
            current_step: clock::effective_step(master_tick, track_divider, self.clock_divider, self.length),
            ..self.clone()
        }
    }

    pub fn reset_playhead(&self) -> Self {
        Self { current_step: 0, ..self.clone() }
    }

    /// Length of one full cycle in master ticks
    pub fn ticks_per_cycle(&self, track_divider: u32) -> u64 {
        clock::combined_divider(track_divider, self.clock_divider) * self.length as u64
    }
}

/// Per-lane lengths, used to size generated patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackLengths {
    pub gate: usize,
    pub pitch: usize,
    pub velocity: usize,
    pub modulation: usize,
}

impl TrackLengths {
    pub fn uniform(length: usize) -> Self {
        Self { gate: length, pitch: length, velocity: length, modulation: length }
    }

    pub fn get(&self, id: SubtrackId) -> usize {
        match id {
            SubtrackId::Gate => self.gate,
            SubtrackId::Pitch => self.pitch,
            SubtrackId::Velocity => self.velocity,
            SubtrackId::Mod => self.modulation,
        }
    }
}

/// One of the four sequencer tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: usize,
    pub name: String,
    /// Multiplies with every subtrack divider
    pub clock_divider: u32,
    pub gate: Subtrack<GateStep>,
    pub pitch: Subtrack<PitchStep>,
    pub velocity: Subtrack<u8>,
    pub modulation: Subtrack<f32>,
}

impl Track {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            clock_divider: 1,
            gate: Subtrack::new(DEFAULT_LENGTH, GateStep::default()),
            pitch: Subtrack::new(DEFAULT_LENGTH, PitchStep::default()),
            velocity: Subtrack::new(DEFAULT_LENGTH, DEFAULT_VELOCITY),
            modulation: Subtrack::new(DEFAULT_LENGTH, DEFAULT_MOD),
        }
    }

    pub fn lengths(&self) -> TrackLengths {
        TrackLengths {
            gate: self.gate.length,
            pitch: self.pitch.length,
            velocity: self.velocity.length,
            modulation: self.modulation.length,
        }
    }

    pub fn subtrack_clock_divider(&self, id: SubtrackId) -> u32 {
        match id {
            SubtrackId::Gate => self.gate.clock_divider,
            SubtrackId::Pitch => self.pitch.clock_divider,
            SubtrackId::Velocity => self.velocity.clock_divider,
            SubtrackId::Mod => self.modulation.clock_divider,
        }
    }

    pub fn current_step(&self, id: SubtrackId) -> usize {
        match id {
            SubtrackId::Gate => self.gate.current_step,
            SubtrackId::Pitch => self.pitch.current_step,
            SubtrackId::Velocity => self.velocity.current_step,
            SubtrackId::Mod => self.modulation.current_step,
        }
    }

    pub fn with_subtrack_length(&self, id: SubtrackId, length: usize) -> Self {
        let mut next = self.clone();
        match id {
            SubtrackId::Gate => next.gate = self.gate.with_length(length, GateStep::default()),
            SubtrackId::Pitch => next.pitch = self.pitch.with_length(length, PitchStep::default()),
            SubtrackId::Velocity => next.velocity = self.velocity.with_length(length, DEFAULT_VELOCITY),
            SubtrackId::Mod => next.modulation = self.modulation.with_length(length, DEFAULT_MOD),
        }
        next
    }

    pub fn with_subtrack_clock_divider(&self, id: SubtrackId, divider: u32) -> Self {
        let mut next = self.clone();
        match id {
            SubtrackId::Gate => next.gate = self.gate.with_clock_divider(divider),
            SubtrackId::Pitch => next.pitch = self.pitch.with_clock_divider(divider),
            SubtrackId::Velocity => next.velocity = self.velocity.with_clock_divider(divider),
            SubtrackId::Mod => next.modulation = self.modulation.with_clock_divider(divider),
        }
        next
    }

    pub fn with_clock_divider(&self, divider: u32) -> Self {
        Self { clock_divider: clamp_divider(divider), ..self.clone() }
    }

    /// Every lane's playhead at `master_tick`
    pub fn advanced_to(&self, master_tick: u64) -> Self {
        Self {
            gate: self.gate.advanced_to(master_tick, self.clock_divider),
            pitch: self.pitch.advanced_to(master_tick, self.clock_divider),
            velocity: self.velocity.advanced_to(master_tick, self.clock_divider),
            modulation: self.modulation.advanced_to(master_tick, self.clock_divider),
            ..self.clone()
        }
    }

    pub fn reset_playheads(&self) -> Self {
        Self {
            gate: self.gate.reset_playhead(),
            pitch: self.pitch.reset_playhead(),
            velocity: self.velocity.reset_playhead(),
            modulation: self.modulation.reset_playhead(),
            ..self.clone()
        }
    }

    /// Same lanes and dividers, every step back at its default
    pub fn cleared(&self) -> Self {
        Self {
            gate: self.gate.map_steps(|_, _| GateStep::default()),
            pitch: self.pitch.map_steps(|_, _| PitchStep::default()),
            velocity: self.velocity.map_steps(|_, _| DEFAULT_VELOCITY),
            modulation: self.modulation.map_steps(|_, _| DEFAULT_MOD),
            ..self.clone()
        }
    }
}
