//! Editing commands addressed to a running sequencer

use serde::{Deserialize, Serialize};
use tetra_core::sequencer::{self, SequencerState};
use tetra_core::{
    factory_preset, ArpConfig, LfoConfig, MutateConfig, Preset, RandomConfig, SubtrackId, TetraError,
    TransposeConfig,
};

/// One UI gesture, already decoded. Applying a command is pure and total:
/// out-of-range targets leave the state unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    SetGateOn { track: usize, step: usize, on: bool },
    SetGateLength { track: usize, step: usize, length: f32 },
    SetRatchet { track: usize, step: usize, ratchet: u8 },
    SetPitchNote { track: usize, step: usize, note: u8 },
    SetSlide { track: usize, step: usize, slide: f32 },
    SetVelocity { track: usize, step: usize, velocity: u8 },
    SetModValue { track: usize, step: usize, value: f32 },
    SetSubtrackLength { track: usize, subtrack: SubtrackId, length: usize },
    SetSubtrackClockDivider { track: usize, subtrack: SubtrackId, divider: u32 },
    SetTrackClockDivider { track: usize, divider: u32 },
    ResetTrackPlayheads { track: usize },
    ClearTrack { track: usize },
    SetMuteLength { output: usize, length: usize },
    SetMuteStep { output: usize, step: usize, muted: bool },
    SetMuteClockDivider { output: usize, divider: u32 },
    SetOutputSource { output: usize, subtrack: SubtrackId, source: usize },
    SetBpm(f64),
    SetPlaying(bool),
    Reset,
    SetDriftSeed(u32),
    SetRandomConfig { track: usize, config: RandomConfig },
    SetMutateConfig { track: usize, config: MutateConfig },
    SetLfoConfig { track: usize, config: Option<LfoConfig> },
    SetArpConfig { track: usize, config: Option<ArpConfig> },
    SetTransposeConfig { track: usize, config: TransposeConfig },
    SavePreset { name: String, track: usize },
    DeletePreset { index: usize },
    ApplyPreset { track: usize, preset: Preset },
    ApplyFactoryPreset { track: usize, name: String },
    Randomize { track: usize, seed: u32 },
    ApplyLfo { track: usize },
    ApplyArp { track: usize },
    Drift { track: usize, seed: u32 },
}

impl Command {
    /// Track the command edits, if any
    pub fn track(&self) -> Option<usize> {
        match self {
            Self::SetGateOn { track, .. }
            | Self::SetGateLength { track, .. }
            | Self::SetRatchet { track, .. }
            | Self::SetPitchNote { track, .. }
            | Self::SetSlide { track, .. }
            | Self::SetVelocity { track, .. }
            | Self::SetModValue { track, .. }
            | Self::SetSubtrackLength { track, .. }
            | Self::SetSubtrackClockDivider { track, .. }
            | Self::SetTrackClockDivider { track, .. }
            | Self::ResetTrackPlayheads { track }
            | Self::ClearTrack { track }
            | Self::SetRandomConfig { track, .. }
            | Self::SetMutateConfig { track, .. }
            | Self::SetLfoConfig { track, .. }
            | Self::SetArpConfig { track, .. }
            | Self::SetTransposeConfig { track, .. }
            | Self::SavePreset { track, .. }
            | Self::ApplyPreset { track, .. }
            | Self::ApplyFactoryPreset { track, .. }
            | Self::Randomize { track, .. }
            | Self::ApplyLfo { track }
            | Self::ApplyArp { track }
            | Self::Drift { track, .. } => Some(*track),
            _ => None,
        }
    }

    /// Why the command would be a no-op on `state`, if it would.
    ///
    /// Clamped arguments are not errors; only missing tracks, outputs,
    /// steps or presets are reported.
    pub fn validate(&self, state: &SequencerState) -> Result<(), TetraError> {
        match self {
            Self::SetGateOn { track, step, .. }
            | Self::SetGateLength { track, step, .. }
            | Self::SetRatchet { track, step, .. } => state.check_step(*track, SubtrackId::Gate, *step),
            Self::SetPitchNote { track, step, .. } | Self::SetSlide { track, step, .. } => {
                state.check_step(*track, SubtrackId::Pitch, *step)
            }
            Self::SetVelocity { track, step, .. } => state.check_step(*track, SubtrackId::Velocity, *step),
            Self::SetModValue { track, step, .. } => state.check_step(*track, SubtrackId::Mod, *step),
            Self::SetMuteStep { output, step, .. } => state.check_mute_step(*output, *step),
            Self::SetMuteLength { output, .. } | Self::SetMuteClockDivider { output, .. } => {
                state.mute_pattern(*output).map(|_| ())
            }
            Self::SetOutputSource { output, .. } => state.output_routing(*output).map(|_| ()),
            Self::ApplyFactoryPreset { track, name } => {
                state.track(*track)?;
                factory_preset(name).map(|_| ())
            }
            other => match other.track() {
                Some(track) => state.track(track).map(|_| ()),
                None => Ok(()),
            },
        }
    }

    pub fn apply(&self, state: &SequencerState) -> SequencerState {
        match self {
            Self::SetGateOn { track, step, on } => sequencer::set_gate_on(state, *track, *step, *on),
            Self::SetGateLength { track, step, length } => sequencer::set_gate_length(state, *track, *step, *length),
            Self::SetRatchet { track, step, ratchet } => sequencer::set_ratchet(state, *track, *step, *ratchet),
            Self::SetPitchNote { track, step, note } => sequencer::set_pitch_note(state, *track, *step, *note),
            Self::SetSlide { track, step, slide } => sequencer::set_slide(state, *track, *step, *slide),
            Self::SetVelocity { track, step, velocity } => sequencer::set_velocity(state, *track, *step, *velocity),
            Self::SetModValue { track, step, value } => sequencer::set_mod_value(state, *track, *step, *value),
            Self::SetSubtrackLength { track, subtrack, length } => {
                sequencer::set_subtrack_length(state, *track, *subtrack, *length)
            }
            Self::SetSubtrackClockDivider { track, subtrack, divider } => {
                sequencer::set_subtrack_clock_divider(state, *track, *subtrack, *divider)
            }
            Self::SetTrackClockDivider { track, divider } => sequencer::set_track_clock_divider(state, *track, *divider),
            Self::ResetTrackPlayheads { track } => sequencer::reset_track_playheads(state, *track),
            Self::ClearTrack { track } => sequencer::clear_track(state, *track),
            Self::SetMuteLength { output, length } => sequencer::set_mute_length(state, *output, *length),
            Self::SetMuteStep { output, step, muted } => sequencer::set_mute_step(state, *output, *step, *muted),
            Self::SetMuteClockDivider { output, divider } => sequencer::set_mute_clock_divider(state, *output, *divider),
            Self::SetOutputSource { output, subtrack, source } => {
                sequencer::set_output_source(state, *output, *subtrack, *source)
            }
            Self::SetBpm(bpm) => sequencer::set_bpm(state, *bpm),
            Self::SetPlaying(playing) => sequencer::set_playing(state, *playing),
            Self::Reset => sequencer::reset(state),
            Self::SetDriftSeed(seed) => sequencer::set_drift_seed(state, *seed),
            Self::SetRandomConfig { track, config } => sequencer::set_random_config(state, *track, *config),
            Self::SetMutateConfig { track, config } => sequencer::set_mutate_config(state, *track, *config),
            Self::SetLfoConfig { track, config } => sequencer::set_lfo_config(state, *track, *config),
            Self::SetArpConfig { track, config } => sequencer::set_arp_config(state, *track, *config),
            Self::SetTransposeConfig { track, config } => sequencer::set_transpose_config(state, *track, *config),
            Self::SavePreset { name, track } => sequencer::save_user_preset(state, name, *track),
            Self::DeletePreset { index } => sequencer::delete_user_preset(state, *index),
            Self::ApplyPreset { track, preset } => sequencer::apply_preset(state, *track, preset),
            Self::ApplyFactoryPreset { track, name } => match factory_preset(name) {
                Ok(preset) => sequencer::apply_preset(state, *track, &preset),
                Err(_) => state.clone(),
            },
            Self::Randomize { track, seed } => sequencer::randomize_track_into(state, *track, *seed),
            Self::ApplyLfo { track } => sequencer::apply_lfo(state, *track),
            Self::ApplyArp { track } => sequencer::apply_arp(state, *track),
            Self::Drift { track, seed } => sequencer::drift_track(state, *track, *seed),
        }
    }
}

/// Apply commands in order
pub fn apply_all<'a>(state: &SequencerState, commands: impl IntoIterator<Item = &'a Command>) -> SequencerState {
    commands
        .into_iter()
        .fold(state.clone(), |state, command| command.apply(&state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::create_sequencer;

    #[test]
    fn test_apply_matches_direct_call() {
        let state = create_sequencer();
        let via_command = Command::SetGateOn { track: 1, step: 4, on: true }.apply(&state);
        assert_eq!(via_command, sequencer::set_gate_on(&state, 1, 4, true));

        let randomized = Command::Randomize { track: 2, seed: 9 }.apply(&state);
        assert_eq!(randomized, sequencer::randomize_track_into(&state, 2, 9));
    }

    #[test]
    fn test_validate_reports_missing_targets() {
        let state = create_sequencer();
        assert_eq!(
            Command::ClearTrack { track: 4 }.validate(&state),
            Err(TetraError::TrackNotFound(4))
        );
        assert_eq!(
            Command::SetMuteLength { output: 6, length: 3 }.validate(&state),
            Err(TetraError::OutputNotFound(6))
        );
        assert!(matches!(
            Command::SetPitchNote { track: 0, step: 20, note: 60 }.validate(&state),
            Err(TetraError::StepOutOfRange { lane: "pitch", step: 20, .. })
        ));
        assert!(Command::ApplyFactoryPreset { track: 0, name: "Nope".into() }.validate(&state).is_err());
        assert!(Command::SetBpm(999.0).validate(&state).is_ok());
        assert!(Command::Reset.validate(&state).is_ok());
    }

    #[test]
    fn test_invalid_commands_are_noops() {
        let state = create_sequencer();
        let commands = [
            Command::SetGateOn { track: 9, step: 0, on: true },
            Command::SetMuteStep { output: 4, step: 0, muted: true },
            Command::ApplyFactoryPreset { track: 0, name: "Nope".into() },
            Command::DeletePreset { index: 3 },
        ];
        for command in &commands {
            assert_eq!(command.apply(&state), state, "{command:?}");
        }
    }

    #[test]
    fn test_apply_all_in_order() {
        let state = create_sequencer();
        let commands = vec![
            Command::ApplyFactoryPreset { track: 0, name: "four on floor".into() },
            Command::Randomize { track: 0, seed: 1 },
            Command::SetSubtrackLength { track: 0, subtrack: SubtrackId::Gate, length: 8 },
            Command::SetPlaying(true),
        ];
        let result = apply_all(&state, &commands);
        assert!(result.transport.playing);
        assert_eq!(result.tracks[0].gate.length, 8);
        // Four On Floor is a 4-in-16 euclidean pattern, truncated to 8 steps
        let gates: Vec<bool> = result.tracks[0].gate.steps.iter().map(|s| s.on).collect();
        assert_eq!(gates, vec![true, false, false, false, true, false, false, false]);
    }

    #[test]
    fn test_track_target() {
        assert_eq!(Command::Drift { track: 3, seed: 0 }.track(), Some(3));
        assert_eq!(Command::SetBpm(100.0).track(), None);
        assert_eq!(Command::SetOutputSource { output: 1, subtrack: SubtrackId::Gate, source: 2 }.track(), None);
    }
}
