//! Output routing, mute overlay and transpose
//!
//! Each of the four outputs picks a source track per parameter. Values are
//! read from the source track's current step, so one output can play the
//! gate of track 1 with the pitch of track 3. Mutes belong to the output:
//! `mutes[i]` silences output `i` whichever track feeds its gate.

use serde::{Deserialize, Serialize};

use crate::scale::{quantize_to_scale, ScaleMode};
use crate::track::{MuteTrack, Track};

pub const NUM_OUTPUTS: usize = 4;

pub const MIN_TRANSPOSE: i8 = -48;
pub const MAX_TRANSPOSE: i8 = 48;

/// Source track index for each parameter of one output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRouting {
    pub gate: usize,
    pub pitch: usize,
    pub velocity: usize,
    pub modulation: usize,
}

impl OutputRouting {
    /// Every parameter from the same track
    pub fn from_track(track: usize) -> Self {
        Self { gate: track, pitch: track, velocity: track, modulation: track }
    }
}

/// Output `i` fed entirely by track `i`
pub fn default_routing() -> [OutputRouting; NUM_OUTPUTS] {
    std::array::from_fn(OutputRouting::from_track)
}

/// Scale the transposed note is snapped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleLock {
    /// Pitch class 0..=11
    pub root: u8,
    pub scale: ScaleMode,
}

/// Per-track pitch offset applied at the output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransposeConfig {
    pub semitones: i8,
    pub scale_lock: Option<ScaleLock>,
}

impl TransposeConfig {
    pub fn clamped(&self) -> Self {
        Self {
            semitones: self.semitones.clamp(MIN_TRANSPOSE, MAX_TRANSPOSE),
            scale_lock: self.scale_lock.map(|lock| ScaleLock { root: lock.root % 12, ..lock }),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.semitones == 0 && self.scale_lock.is_none()
    }

    pub fn apply(&self, note: u8) -> u8 {
        let shifted = (note as i16 + self.semitones as i16).clamp(0, 127) as u8;
        match self.scale_lock {
            Some(lock) => quantize_to_scale(shifted, lock.root, lock.scale),
            None => shifted,
        }
    }
}

/// What one output plays on one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteEvent {
    pub output: usize,
    pub gate: bool,
    pub pitch: u8,
    pub velocity: u8,
    pub modulation: f32,
    /// Fraction of the step the gate stays open
    pub gate_length: f32,
    pub ratchet_count: u8,
    /// Portamento time in seconds
    pub slide: f32,
}

impl NoteEvent {
    pub fn silent(output: usize) -> Self {
        Self { output, ..Default::default() }
    }
}

fn is_muted(mutes: &[MuteTrack], output: usize) -> bool {
    mutes
        .get(output)
        .and_then(|mute| mute.current())
        .copied()
        .unwrap_or(false)
}

fn resolve_output(
    output: usize,
    tracks: &[Track],
    routing: Option<&OutputRouting>,
    mutes: &[MuteTrack],
    transposes: &[TransposeConfig],
) -> NoteEvent {
    let mut event = NoteEvent::silent(output);
    let Some(routing) = routing else {
        return event;
    };

    if let Some(gate) = tracks.get(routing.gate).and_then(|t| t.gate.current()) {
        event.gate = gate.on;
        event.gate_length = gate.length;
        event.ratchet_count = gate.ratchet;
    }
    if let Some(pitch) = tracks.get(routing.pitch).and_then(|t| t.pitch.current()) {
        event.pitch = match transposes.get(routing.pitch) {
            Some(transpose) if !transpose.is_identity() => transpose.apply(pitch.note),
            _ => pitch.note,
        };
        event.slide = pitch.slide;
    }
    if let Some(&velocity) = tracks.get(routing.velocity).and_then(|t| t.velocity.current()) {
        event.velocity = velocity;
    }
    if let Some(&value) = tracks.get(routing.modulation).and_then(|t| t.modulation.current()) {
        event.modulation = value;
    }

    if is_muted(mutes, output) {
        event.gate = false;
    }
    event
}

/// One event per output from the tracks' current steps
pub fn resolve_outputs(
    tracks: &[Track],
    routing: &[OutputRouting],
    mutes: &[MuteTrack],
    transposes: &[TransposeConfig],
) -> Vec<NoteEvent> {
    (0..NUM_OUTPUTS)
        .map(|output| resolve_output(output, tracks, routing.get(output), mutes, transposes))
        .collect()
}
