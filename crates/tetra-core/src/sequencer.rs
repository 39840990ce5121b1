//! Sequencer state and the pure operations over it
//!
//! `SequencerState` is an immutable snapshot. Every operation here borrows
//! one and returns a new one; lanes that an operation does not touch keep
//! their shared step storage, so callers can detect change with
//! `Arc::ptr_eq`. Indices outside the four tracks or outputs leave the state
//! unchanged, and numeric arguments are clamped on write.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::arp::{generate_arp_pattern, ArpConfig};
use crate::error::{Result, TetraError};
use crate::lfo::{generate_lfo_pattern, LfoConfig};
use crate::mutate::{drift_boundary, mutate_track, MutateConfig};
use crate::preset::Preset;
use crate::random::{randomize_track, RandomConfig};
use crate::routing::{default_routing, resolve_outputs, NoteEvent, OutputRouting, TransposeConfig, NUM_OUTPUTS};
use crate::track::{
    quantize_gate_length, GateStep, MuteTrack, PitchStep, Subtrack, SubtrackId, Track,
    DEFAULT_LENGTH, DEFAULT_MOD, DEFAULT_VELOCITY, MAX_RATCHET, MAX_SLIDE,
};
use crate::transport::Transport;

pub const NUM_TRACKS: usize = 4;

/// Spreads drift seeds of neighbouring tracks apart
const DRIFT_TRACK_STRIDE: u32 = 7919;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    pub tracks: [Track; NUM_TRACKS],
    pub routing: [OutputRouting; NUM_OUTPUTS],
    /// Indexed by output, not by track
    pub mute_patterns: [MuteTrack; NUM_OUTPUTS],
    pub transport: Transport,
    pub random_configs: [RandomConfig; NUM_TRACKS],
    pub mutate_configs: [MutateConfig; NUM_TRACKS],
    pub lfo_configs: [Option<LfoConfig>; NUM_TRACKS],
    pub arp_configs: [Option<ArpConfig>; NUM_TRACKS],
    pub transpose_configs: [TransposeConfig; NUM_TRACKS],
    pub user_presets: Vec<Preset>,
    /// Base seed for drift firings during `tick`
    pub drift_seed: u32,
}

impl SequencerState {
    pub fn track(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index).ok_or(TetraError::TrackNotFound(index))
    }

    pub fn output_routing(&self, output: usize) -> Result<&OutputRouting> {
        self.routing.get(output).ok_or(TetraError::OutputNotFound(output))
    }

    pub fn mute_pattern(&self, output: usize) -> Result<&MuteTrack> {
        self.mute_patterns.get(output).ok_or(TetraError::OutputNotFound(output))
    }

    /// Ok when `step` exists on lane `id` of track `index`
    pub fn check_step(&self, index: usize, id: SubtrackId, step: usize) -> Result<()> {
        let length = self.track(index)?.lengths().get(id);
        if step < length {
            Ok(())
        } else {
            Err(TetraError::StepOutOfRange { lane: id.name(), step, length })
        }
    }

    /// Ok when `step` exists on the mute lane of `output`
    pub fn check_mute_step(&self, output: usize, step: usize) -> Result<()> {
        let length = self.mute_pattern(output)?.length;
        if step < length {
            Ok(())
        } else {
            Err(TetraError::StepOutOfRange { lane: "mute", step, length })
        }
    }
}

impl Default for SequencerState {
    fn default() -> Self {
        create_sequencer()
    }
}

/// Four empty 16-step tracks, one-to-one routing, nothing muted, stopped at tick 0
pub fn create_sequencer() -> SequencerState {
    SequencerState {
        tracks: std::array::from_fn(|i| Track::new(i, format!("Track {}", i + 1))),
        routing: default_routing(),
        mute_patterns: std::array::from_fn(|_| Subtrack::new(DEFAULT_LENGTH, false)),
        transport: Transport::default(),
        random_configs: [RandomConfig::default(); NUM_TRACKS],
        mutate_configs: [MutateConfig::default(); NUM_TRACKS],
        lfo_configs: [None; NUM_TRACKS],
        arp_configs: [None; NUM_TRACKS],
        transpose_configs: [TransposeConfig::default(); NUM_TRACKS],
        user_presets: Vec::new(),
        drift_seed: 0,
    }
}

/// Output of one master tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    /// Playheads already on the next step
    pub state: SequencerState,
    /// What every output played on this tick
    pub events: Vec<NoteEvent>,
}

fn drift_seed_for(base: u32, track: usize, boundary: u64) -> u32 {
    base.wrapping_add(DRIFT_TRACK_STRIDE.wrapping_mul(track as u32))
        .wrapping_add(boundary as u32)
}

/// Advance one master tick.
///
/// Events are resolved from every lane's step at the current tick. The
/// returned state has its playheads at the following tick, with any drift
/// that fired on this tick already applied.
pub fn tick(state: &SequencerState) -> TickResult {
    let master_tick = state.transport.master_tick;
    let next_tick = master_tick + 1;

    let playing = state.tracks.each_ref().map(|t| t.advanced_to(master_tick));
    let mutes = state.mute_patterns.each_ref().map(|m| m.advanced_to(master_tick, 1));
    let events = resolve_outputs(&playing, &state.routing, &mutes, &state.transpose_configs);

    let tracks = std::array::from_fn(|i| {
        let advanced = playing[i].advanced_to(next_tick);
        let mutate_config = &state.mutate_configs[i];
        let Some(boundary) = drift_boundary(mutate_config, &advanced, master_tick) else {
            return advanced;
        };
        let seed = drift_seed_for(state.drift_seed, i, boundary);
        let drifted = match mutate_track(&advanced, &state.random_configs[i], mutate_config, seed) {
            Cow::Owned(track) => Some(track),
            Cow::Borrowed(_) => None,
        };
        debug!(track = i, master_tick, boundary, seed, changed = drifted.is_some(), "Drift fired");
        drifted.unwrap_or(advanced)
    });

    trace!(master_tick, "Tick");

    TickResult {
        state: SequencerState {
            tracks,
            mute_patterns: mutes.each_ref().map(|m| m.advanced_to(next_tick, 1)),
            transport: state.transport.advanced(),
            ..state.clone()
        },
        events,
    }
}

fn update_track(state: &SequencerState, index: usize, f: impl FnOnce(&Track) -> Track) -> SequencerState {
    let Some(track) = state.tracks.get(index) else {
        return state.clone();
    };
    let mut next = state.clone();
    next.tracks[index] = f(track);
    next
}

fn update_mute(state: &SequencerState, output: usize, f: impl FnOnce(&MuteTrack) -> MuteTrack) -> SequencerState {
    let Some(mute) = state.mute_patterns.get(output) else {
        return state.clone();
    };
    let mut next = state.clone();
    next.mute_patterns[output] = f(mute);
    next
}

fn update_config<T: Clone>(
    state: &SequencerState,
    index: usize,
    select: impl FnOnce(&mut SequencerState) -> &mut [T; NUM_TRACKS],
    value: T,
) -> SequencerState {
    if index >= NUM_TRACKS {
        return state.clone();
    }
    let mut next = state.clone();
    select(&mut next)[index] = value;
    next
}

// Step edits

pub fn set_gate_on(state: &SequencerState, track: usize, step: usize, on: bool) -> SequencerState {
    update_track(state, track, |t| Track {
        gate: t.gate.update_step(step, |s| GateStep { on, ..*s }),
        ..t.clone()
    })
}

pub fn set_gate_length(state: &SequencerState, track: usize, step: usize, length: f32) -> SequencerState {
    let length = quantize_gate_length(length);
    update_track(state, track, |t| Track {
        gate: t.gate.update_step(step, |s| GateStep { length, ..*s }),
        ..t.clone()
    })
}

pub fn set_ratchet(state: &SequencerState, track: usize, step: usize, ratchet: u8) -> SequencerState {
    let ratchet = ratchet.clamp(1, MAX_RATCHET);
    update_track(state, track, |t| Track {
        gate: t.gate.update_step(step, |s| GateStep { ratchet, ..*s }),
        ..t.clone()
    })
}

pub fn set_pitch_note(state: &SequencerState, track: usize, step: usize, note: u8) -> SequencerState {
    let note = note.min(127);
    update_track(state, track, |t| Track {
        pitch: t.pitch.update_step(step, |s| PitchStep { note, ..*s }),
        ..t.clone()
    })
}

pub fn set_slide(state: &SequencerState, track: usize, step: usize, slide: f32) -> SequencerState {
    let slide = if slide.is_nan() { 0.0 } else { slide.clamp(0.0, MAX_SLIDE) };
    update_track(state, track, |t| Track {
        pitch: t.pitch.update_step(step, |s| PitchStep { slide, ..*s }),
        ..t.clone()
    })
}

pub fn set_velocity(state: &SequencerState, track: usize, step: usize, velocity: u8) -> SequencerState {
    update_track(state, track, |t| Track {
        velocity: t.velocity.with_step(step, velocity.min(127)),
        ..t.clone()
    })
}

pub fn set_mod_value(state: &SequencerState, track: usize, step: usize, value: f32) -> SequencerState {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    update_track(state, track, |t| Track {
        modulation: t.modulation.with_step(step, value),
        ..t.clone()
    })
}

// Lane shape and timing

pub fn set_subtrack_length(state: &SequencerState, track: usize, id: SubtrackId, length: usize) -> SequencerState {
    update_track(state, track, |t| t.with_subtrack_length(id, length))
}

pub fn set_subtrack_clock_divider(
    state: &SequencerState,
    track: usize,
    id: SubtrackId,
    divider: u32,
) -> SequencerState {
    update_track(state, track, |t| t.with_subtrack_clock_divider(id, divider))
}

pub fn set_track_clock_divider(state: &SequencerState, track: usize, divider: u32) -> SequencerState {
    update_track(state, track, |t| t.with_clock_divider(divider))
}

pub fn reset_track_playheads(state: &SequencerState, track: usize) -> SequencerState {
    update_track(state, track, Track::reset_playheads)
}

/// Every step back to its default; lengths and dividers stay
pub fn clear_track(state: &SequencerState, track: usize) -> SequencerState {
    update_track(state, track, Track::cleared)
}

// Mutes and routing

pub fn set_mute_length(state: &SequencerState, output: usize, length: usize) -> SequencerState {
    update_mute(state, output, |m| m.with_length(length, false))
}

pub fn set_mute_step(state: &SequencerState, output: usize, step: usize, muted: bool) -> SequencerState {
    update_mute(state, output, |m| m.with_step(step, muted))
}

pub fn set_mute_clock_divider(state: &SequencerState, output: usize, divider: u32) -> SequencerState {
    update_mute(state, output, |m| m.with_clock_divider(divider))
}

/// Route one parameter of `output` from `source` (clamped to a valid track)
pub fn set_output_source(state: &SequencerState, output: usize, id: SubtrackId, source: usize) -> SequencerState {
    let Some(routing) = state.routing.get(output) else {
        return state.clone();
    };
    let source = source.min(NUM_TRACKS - 1);
    let routing = match id {
        SubtrackId::Gate => OutputRouting { gate: source, ..*routing },
        SubtrackId::Pitch => OutputRouting { pitch: source, ..*routing },
        SubtrackId::Velocity => OutputRouting { velocity: source, ..*routing },
        SubtrackId::Mod => OutputRouting { modulation: source, ..*routing },
    };
    let mut next = state.clone();
    next.routing[output] = routing;
    next
}

// Transport

pub fn set_bpm(state: &SequencerState, bpm: f64) -> SequencerState {
    SequencerState { transport: state.transport.with_bpm(bpm), ..state.clone() }
}

pub fn set_playing(state: &SequencerState, playing: bool) -> SequencerState {
    SequencerState { transport: state.transport.with_playing(playing), ..state.clone() }
}

/// Master tick and every playhead back to zero; patterns and configs stay
pub fn reset(state: &SequencerState) -> SequencerState {
    SequencerState {
        tracks: state.tracks.each_ref().map(Track::reset_playheads),
        mute_patterns: state.mute_patterns.each_ref().map(Subtrack::reset_playhead),
        transport: state.transport.rewound(),
        ..state.clone()
    }
}

// Per-track configs

pub fn set_random_config(state: &SequencerState, track: usize, config: RandomConfig) -> SequencerState {
    update_config(state, track, |s| &mut s.random_configs, config.clamped())
}

pub fn set_mutate_config(state: &SequencerState, track: usize, config: MutateConfig) -> SequencerState {
    update_config(state, track, |s| &mut s.mutate_configs, config.clamped())
}

pub fn set_lfo_config(state: &SequencerState, track: usize, config: Option<LfoConfig>) -> SequencerState {
    update_config(state, track, |s| &mut s.lfo_configs, config.map(|c| c.clamped()))
}

pub fn set_arp_config(state: &SequencerState, track: usize, config: Option<ArpConfig>) -> SequencerState {
    update_config(state, track, |s| &mut s.arp_configs, config.map(|c| c.clamped()))
}

pub fn set_transpose_config(state: &SequencerState, track: usize, config: TransposeConfig) -> SequencerState {
    update_config(state, track, |s| &mut s.transpose_configs, config.clamped())
}

pub fn set_drift_seed(state: &SequencerState, seed: u32) -> SequencerState {
    SequencerState { drift_seed: seed, ..state.clone() }
}

// Presets

/// Append the track's randomizer config as a named user preset
pub fn save_user_preset(state: &SequencerState, name: &str, track: usize) -> SequencerState {
    let Some(config) = state.random_configs.get(track) else {
        return state.clone();
    };
    let mut next = state.clone();
    next.user_presets.push(Preset::new(name, *config));
    next
}

pub fn delete_user_preset(state: &SequencerState, index: usize) -> SequencerState {
    if index >= state.user_presets.len() {
        return state.clone();
    }
    let mut next = state.clone();
    next.user_presets.remove(index);
    next
}

pub fn apply_preset(state: &SequencerState, track: usize, preset: &Preset) -> SequencerState {
    set_random_config(state, track, preset.config)
}

// Generators

/// Regenerate every lane of `track` from its randomizer config
pub fn randomize_track_into(state: &SequencerState, track: usize, seed: u32) -> SequencerState {
    let Some(config) = state.random_configs.get(track) else {
        return state.clone();
    };
    let config = config.clamped();
    debug!(track, seed, "Track randomized");

    update_track(state, track, |t| {
        let fresh = randomize_track(&config, t.lengths(), seed);
        let defaults = GateStep::default();
        Track {
            gate: t.gate.map_steps(|i, _| GateStep {
                on: fresh.gates.get(i).copied().unwrap_or(defaults.on),
                length: fresh.gate_lengths.get(i).copied().unwrap_or(defaults.length),
                ratchet: fresh.ratchets.get(i).copied().unwrap_or(defaults.ratchet),
            }),
            pitch: t.pitch.map_steps(|i, s| PitchStep {
                note: fresh.pitches.get(i).copied().unwrap_or(s.note),
                slide: fresh.slides.get(i).copied().unwrap_or(0.0),
            }),
            velocity: t.velocity.map_steps(|i, _| fresh.velocities.get(i).copied().unwrap_or(DEFAULT_VELOCITY)),
            modulation: t.modulation.map_steps(|i, _| fresh.mods.get(i).copied().unwrap_or(DEFAULT_MOD)),
            ..t.clone()
        }
    })
}

/// Write the MOD lane from the track's LFO; no-op without an LFO config
pub fn apply_lfo(state: &SequencerState, track: usize) -> SequencerState {
    let Some(Some(config)) = state.lfo_configs.get(track) else {
        return state.clone();
    };
    let config = config.clamped();
    debug!(track, waveform = %config.waveform, rate = config.rate, "LFO applied");

    update_track(state, track, |t| {
        let values = generate_lfo_pattern(&config, t.modulation.length);
        Track {
            modulation: t.modulation.map_steps(|i, old| values.get(i).copied().unwrap_or(*old)),
            ..t.clone()
        }
    })
}

/// Write pitch notes from the track's arpeggiator, keeping slides
pub fn apply_arp(state: &SequencerState, track: usize) -> SequencerState {
    let Some(Some(config)) = state.arp_configs.get(track) else {
        return state.clone();
    };
    let config = config.clamped();
    debug!(track, direction = %config.direction, scale = %config.scale, "Arp applied");

    update_track(state, track, |t| {
        let notes = generate_arp_pattern(
            config.root,
            config.scale,
            config.direction,
            config.octave_range,
            t.pitch.length,
            config.seed,
        );
        Track {
            pitch: t.pitch.map_steps(|i, s| PitchStep {
                note: notes.get(i).copied().unwrap_or(s.note),
                ..*s
            }),
            ..t.clone()
        }
    })
}

/// One out-of-band drift pass; unchanged state when no step was picked
pub fn drift_track(state: &SequencerState, track: usize, seed: u32) -> SequencerState {
    let (Some(current), Some(random), Some(mutate)) = (
        state.tracks.get(track),
        state.random_configs.get(track),
        state.mutate_configs.get(track),
    ) else {
        return state.clone();
    };

    match mutate_track(current, random, mutate, seed) {
        Cow::Borrowed(_) => state.clone(),
        Cow::Owned(drifted) => {
            debug!(track, seed, "Track drifted");
            let mut next = state.clone();
            next.tracks[track] = drifted;
            next
        }
    }
}
