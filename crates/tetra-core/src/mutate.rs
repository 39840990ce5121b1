//! Drift: probabilistic per-step regeneration of a live track
//!
//! A drift pass picks steps per lane with a Bernoulli draw at the lane's
//! rate, generates one full replacement pattern, and splices only the picked
//! steps into the track. Only the drifting field of compound steps changes:
//! a gate keeps its length and ratchet, a pitch keeps its slide.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{self, TICKS_PER_BAR};
use crate::error::TetraError;
use crate::random::{randomize_track, RandomConfig};
use crate::rng::Rng;
use crate::scale::normalize;
use crate::track::{GateStep, PitchStep, Subtrack, Track};

/// Offset between the selection stream and the replacement patterns
const REPLACEMENT_SEED: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MutateTrigger {
    /// Every `bars` completed loops of the gate lane
    #[default]
    Loop,
    /// Every `bars` bars of master clock, whatever the loop length
    Bars,
}

impl MutateTrigger {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loop => "Loop",
            Self::Bars => "Bars",
        }
    }
}

impl fmt::Display for MutateTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MutateTrigger {
    type Err = TetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "loop" => Ok(Self::Loop),
            "bars" | "bar" => Ok(Self::Bars),
            _ => Err(TetraError::unknown("drift trigger", s)),
        }
    }
}

/// Drift rates and cadence for one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutateConfig {
    pub trigger: MutateTrigger,
    pub bars: u32,
    pub gate: f32,
    pub pitch: f32,
    pub velocity: f32,
    pub modulation: f32,
}

impl Default for MutateConfig {
    fn default() -> Self {
        Self {
            trigger: MutateTrigger::Loop,
            bars: 1,
            gate: 0.0,
            pitch: 0.0,
            velocity: 0.0,
            modulation: 0.0,
        }
    }
}

impl MutateConfig {
    pub fn clamped(&self) -> Self {
        let rate = |r: f32| if r.is_nan() { 0.0 } else { r.clamp(0.0, 1.0) };
        Self {
            trigger: self.trigger,
            bars: self.bars.clamp(1, 64),
            gate: rate(self.gate),
            pitch: rate(self.pitch),
            velocity: rate(self.velocity),
            modulation: rate(self.modulation),
        }
    }
}

pub fn is_mutate_active(config: &MutateConfig) -> bool {
    config.gate > 0.0 || config.pitch > 0.0 || config.velocity > 0.0 || config.modulation > 0.0
}

/// Indices whose Bernoulli(`rate`) draw hit; no draws at all when the rate is zero
fn select_steps(rate: f32, length: usize, rng: &mut Rng) -> Vec<usize> {
    if rate <= 0.0 {
        return vec![];
    }
    (0..length).filter(|_| rng.chance(rate as f64)).collect()
}

fn splice<T: Clone, V: Copy>(
    lane: &Subtrack<T>,
    picked: &[usize],
    replacement: &[V],
    apply: impl Fn(&T, V) -> T,
) -> Subtrack<T> {
    let mut next = lane.clone();
    let steps = Arc::make_mut(&mut next.steps);
    for &i in picked {
        if let (Some(step), Some(&value)) = (steps.get_mut(i), replacement.get(i)) {
            *step = apply(step, value);
        }
    }
    next
}

/// One drift pass over `track`.
///
/// Returns `Cow::Borrowed(track)` when no step was picked in any lane, so
/// callers can tell "unchanged" apart without comparing steps. Lanes with no
/// picked steps keep their storage.
pub fn mutate_track<'a>(
    track: &'a Track,
    random_config: &RandomConfig,
    mutate_config: &MutateConfig,
    seed: u32,
) -> Cow<'a, Track> {
    let config = mutate_config.clamped();
    let mut rng = Rng::new(seed);

    let gate_picks = select_steps(config.gate, track.gate.length, &mut rng);
    let pitch_picks = select_steps(config.pitch, track.pitch.length, &mut rng);
    let velocity_picks = select_steps(config.velocity, track.velocity.length, &mut rng);
    let mod_picks = select_steps(config.modulation, track.modulation.length, &mut rng);

    if gate_picks.is_empty() && pitch_picks.is_empty() && velocity_picks.is_empty() && mod_picks.is_empty() {
        return Cow::Borrowed(track);
    }

    let fresh = randomize_track(random_config, track.lengths(), seed.wrapping_add(REPLACEMENT_SEED));
    let mut next = track.clone();

    if !gate_picks.is_empty() {
        next.gate = splice(&track.gate, &gate_picks, &fresh.gates, |step, on| {
            GateStep { on, ..*step }
        });
    }
    if !pitch_picks.is_empty() {
        next.pitch = splice(&track.pitch, &pitch_picks, &fresh.pitches, |step, note| {
            PitchStep { note, ..*step }
        });
    }
    if !velocity_picks.is_empty() {
        next.velocity = splice(&track.velocity, &velocity_picks, &fresh.velocities, |_, v| v);
    }
    if !mod_picks.is_empty() {
        next.modulation = splice(&track.modulation, &mod_picks, &fresh.mods, |_, v| v);
    }

    Cow::Owned(next)
}

/// Boundary index if drift fires on the step from `master_tick` to
/// `master_tick + 1`, otherwise `None`.
///
/// Loop mode counts completed cycles of the gate lane (track divider ×
/// lane divider × lane length) and fires on every `bars`-th one. Bars mode
/// fires every `bars × 16` master ticks.
pub fn drift_boundary(config: &MutateConfig, track: &Track, master_tick: u64) -> Option<u64> {
    if !is_mutate_active(config) {
        return None;
    }
    let bars = config.bars.max(1) as u64;
    let next_tick = master_tick + 1;

    match config.trigger {
        MutateTrigger::Loop => {
            let cycle = track.gate.ticks_per_cycle(track.clock_divider);
            if next_tick % cycle != 0 {
                return None;
            }
            let loops = clock::completed_loops(
                next_tick,
                track.clock_divider,
                track.gate.clock_divider,
                track.gate.length,
            );
            (loops % bars == 0).then_some(loops)
        }
        MutateTrigger::Bars => {
            (next_tick % (TICKS_PER_BAR * bars) == 0).then_some(next_tick / TICKS_PER_BAR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::SubtrackId;

    fn busy_track() -> Track {
        let track = Track::new(0, "T");
        Track {
            gate: track.gate.map_steps(|i, _| GateStep {
                on: i % 2 == 0,
                length: 0.3,
                ratchet: 3,
            }),
            pitch: track.pitch.map_steps(|i, _| PitchStep { note: 40 + i as u8, slide: 0.2 }),
            ..track
        }
    }

    #[test]
    fn test_inactive_config_is_noop() {
        let track = busy_track();
        let result = mutate_track(&track, &RandomConfig::default(), &MutateConfig::default(), 9);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert!(!is_mutate_active(&MutateConfig::default()));
    }

    #[test]
    fn test_gate_drift_keeps_length_and_ratchet() {
        let track = busy_track();
        let config = MutateConfig { gate: 1.0, ..Default::default() };
        let mut changed_somewhere = false;

        for seed in 0..16 {
            let result = mutate_track(&track, &RandomConfig::default(), &config, seed);
            let mutated = result.as_ref();
            for (before, after) in track.gate.steps.iter().zip(mutated.gate.steps.iter()) {
                assert_eq!(after.length, before.length);
                assert_eq!(after.ratchet, before.ratchet);
                changed_somewhere |= after.on != before.on;
            }
            assert!(Arc::ptr_eq(&track.pitch.steps, &mutated.pitch.steps));
            assert!(Arc::ptr_eq(&track.velocity.steps, &mutated.velocity.steps));
            assert!(Arc::ptr_eq(&track.modulation.steps, &mutated.modulation.steps));
        }
        assert!(changed_somewhere);
    }

    #[test]
    fn test_pitch_drift_keeps_slide() {
        let track = busy_track();
        let config = MutateConfig { pitch: 0.5, ..Default::default() };
        let result = mutate_track(&track, &RandomConfig::default(), &config, 4);
        let mutated = result.as_ref();
        assert!(mutated.pitch.steps.iter().all(|s| s.slide == 0.2));
        assert!(Arc::ptr_eq(&track.gate.steps, &mutated.gate.steps));
    }

    #[test]
    fn test_full_rate_replaces_with_generated_values() {
        let track = busy_track();
        let random = RandomConfig::default();
        let config = MutateConfig { velocity: 1.0, modulation: 1.0, ..Default::default() };
        let result = mutate_track(&track, &random, &config, 30);
        let fresh = randomize_track(&random, track.lengths(), 31);
        assert_eq!(*result.velocity.steps, fresh.velocities);
        assert_eq!(*result.modulation.steps, fresh.mods);
    }

    #[test]
    fn test_deterministic() {
        let track = busy_track();
        let config = MutateConfig { gate: 0.3, pitch: 0.3, velocity: 0.3, modulation: 0.3, ..Default::default() };
        let a = mutate_track(&track, &RandomConfig::default(), &config, 77).into_owned();
        let b = mutate_track(&track, &RandomConfig::default(), &config, 77).into_owned();
        assert_eq!(a, b);
        let other = mutate_track(&track, &RandomConfig::default(), &config, 78).into_owned();
        assert_ne!(a, other);
    }

    #[test]
    fn test_loop_trigger_on_gate_wrap() {
        let track = Track::new(0, "T").with_subtrack_length(SubtrackId::Gate, 4);
        let config = MutateConfig { gate: 0.5, bars: 2, ..Default::default() };
        let fired: Vec<(u64, u64)> = (0..20)
            .filter_map(|mt| drift_boundary(&config, &track, mt).map(|b| (mt, b)))
            .collect();
        // Loops complete at ticks 4, 8, 12, 16; every second one fires
        assert_eq!(fired, vec![(7, 2), (15, 4)]);
    }

    #[test]
    fn test_bars_trigger_ignores_loop_length() {
        let track = Track::new(0, "T").with_subtrack_length(SubtrackId::Gate, 5);
        let config = MutateConfig { trigger: MutateTrigger::Bars, bars: 1, pitch: 0.1, ..Default::default() };
        let fired: Vec<u64> = (0..48).filter(|&mt| drift_boundary(&config, &track, mt).is_some()).collect();
        assert_eq!(fired, vec![15, 31, 47]);
    }

    #[test]
    fn test_inactive_never_triggers() {
        let track = Track::new(0, "T");
        assert!((0..64).all(|mt| drift_boundary(&MutateConfig::default(), &track, mt).is_none()));
    }

    #[test]
    fn test_trigger_parse() {
        assert_eq!("bars".parse::<MutateTrigger>(), Ok(MutateTrigger::Bars));
        assert_eq!("Loop".parse::<MutateTrigger>(), Ok(MutateTrigger::Loop));
        assert!("beat".parse::<MutateTrigger>().is_err());
    }
}
