//! Thread-free rendering of a session

use tetra_core::{tick, SequencerState};
use tracing::debug;

use crate::clock_driver::TickBatch;
use crate::command::Command;

/// Lazily rendered ticks; each `next` plays one master tick.
///
/// Scheduled `(master_tick, command)` pairs are applied just before that
/// tick is played.
pub struct OfflineTicks<'a> {
    state: SequencerState,
    remaining: u64,
    commands: &'a [(u64, Command)],
}

impl<'a> OfflineTicks<'a> {
    pub fn new(state: &SequencerState, ticks: u64, commands: &'a [(u64, Command)]) -> Self {
        Self { state: state.clone(), remaining: ticks, commands }
    }

    /// State after the ticks rendered so far
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn into_state(self) -> SequencerState {
        self.state
    }
}

impl Iterator for OfflineTicks<'_> {
    type Item = TickBatch;

    fn next(&mut self) -> Option<TickBatch> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let master_tick = self.state.transport.master_tick;
        for (_, command) in self.commands.iter().filter(|(at, _)| *at == master_tick) {
            self.state = command.apply(&self.state);
        }

        let step_secs = self.state.transport.step_secs();
        let result = tick(&self.state);
        self.state = result.state;
        Some(TickBatch { master_tick, events: result.events, step_secs })
    }
}

/// Run `ticks` master ticks back to back, whatever the transport's run state.
///
/// Returns the final state and one batch per tick; batches carry the step
/// length the tick would have had in real time.
pub fn render_offline(state: &SequencerState, ticks: u64) -> (SequencerState, Vec<TickBatch>) {
    render_offline_with(state, ticks, &[])
}

/// Like [`render_offline`], with scheduled commands
pub fn render_offline_with(
    state: &SequencerState,
    ticks: u64,
    commands: &[(u64, Command)],
) -> (SequencerState, Vec<TickBatch>) {
    let mut render = OfflineTicks::new(state, ticks, commands);
    let batches: Vec<TickBatch> = render.by_ref().collect();
    let state = render.into_state();

    debug!(ticks, final_tick = state.transport.master_tick, "Offline render finished");
    (state, batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::create_sequencer;
    use tetra_core::sequencer::{randomize_track_into, set_gate_on};

    #[test]
    fn test_render_matches_manual_ticks() {
        let state = set_gate_on(&create_sequencer(), 0, 0, true);
        let (final_state, batches) = render_offline(&state, 17);
        assert_eq!(batches.len(), 17);
        assert_eq!(final_state.transport.master_tick, 17);
        assert_eq!(final_state.tracks[0].gate.current_step, 1);
        assert!(batches[0].events[0].gate);
        assert_eq!(batches[16].master_tick, 16);
        assert!((batches[0].step_secs - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_render_is_deterministic() {
        let state = randomize_track_into(&create_sequencer(), 1, 77);
        let (a_state, a) = render_offline(&state, 64);
        let (b_state, b) = render_offline(&state, 64);
        assert_eq!(a, b);
        assert_eq!(a_state, b_state);
    }

    #[test]
    fn test_scheduled_commands() {
        let state = create_sequencer();
        let commands = [
            (2, Command::SetGateOn { track: 0, step: 3, on: true }),
            (3, Command::SetBpm(60.0)),
        ];
        let (_, batches) = render_offline_with(&state, 5, &commands);
        assert!(!batches[2].events[0].gate);
        assert!(batches[3].events[0].gate);
        assert!((batches[2].step_secs - 0.125).abs() < 1e-12);
        assert!((batches[3].step_secs - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_ticks_render_lazily() {
        let state = set_gate_on(&create_sequencer(), 0, 2, true);
        let mut render = OfflineTicks::new(&state, u64::MAX, &[]);
        let first: Vec<TickBatch> = render.by_ref().take(3).collect();
        assert_eq!(render.state().transport.master_tick, 3);
        assert!(first[2].events[0].gate);

        let (_, batches) = render_offline(&state, 3);
        assert_eq!(first, batches);
    }
}
