//! Constrained pattern randomization
//!
//! Each generator is a pure `(config, length, seed) -> Vec<_>` function.
//! `randomize_track` runs all of them with derived seeds so that changing
//! one parameter's config never shifts another parameter's stream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TetraError;
use crate::euclidean::{euclidean, rotate};
use crate::rng::Rng;
use crate::scale::{normalize, scale_notes_in_range, ScaleMode};
use crate::smart_gate::{generate_smart_gate_lane, hit_range, scatter_hits, SmartDensity, SmartGateParams};
use crate::track::{TrackLengths, MAX_GATE_LENGTH, MAX_RATCHET, MIN_GATE_LENGTH};

/// Portamento time written by the slide randomizer
pub const RANDOM_SLIDE_TIME: f32 = 0.10;

/// Seed offsets per parameter, relative to the track seed
const GATE_SEED: u32 = 0;
const PITCH_SEED: u32 = 1;
const VELOCITY_SEED: u32 = 2;
const GATE_LENGTH_SEED: u32 = 3;
const RATCHET_SEED: u32 = 4;
const SLIDE_SEED: u32 = 5;
const MOD_SEED: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GateMode {
    #[default]
    Random,
    Euclidean,
}

impl GateMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Euclidean => "Euclidean",
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GateMode {
    type Err = TetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "random" => Ok(Self::Random),
            "euclidean" | "euclid" => Ok(Self::Euclidean),
            _ => Err(TetraError::unknown("gate mode", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub low: u8,
    pub high: u8,
    pub scale: ScaleMode,
    /// Pitch class 0..=11 (C = 0)
    pub root: u8,
    /// Cap on distinct notes, 0 = no cap
    pub max_notes: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self { low: 48, high: 72, scale: ScaleMode::Minor, root: 0, max_notes: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub fill_min: f32,
    pub fill_max: f32,
    pub mode: GateMode,
    /// Rotate euclidean patterns by a random offset
    pub euclidean_offset: bool,
    /// Bars for density shaping in random mode, 1 = off
    pub smart_bars: usize,
    pub density: SmartDensity,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fill_min: 0.25,
            fill_max: 0.5,
            mode: GateMode::Random,
            euclidean_offset: false,
            smart_bars: 1,
            density: SmartDensity::Build,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    pub low: u8,
    pub high: u8,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self { low: 64, high: 127 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateLengthConfig {
    pub min: f32,
    pub max: f32,
}

impl Default for GateLengthConfig {
    fn default() -> Self {
        Self { min: 0.25, max: 0.75 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatchetConfig {
    pub max_ratchet: u8,
    pub probability: f32,
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self { max_ratchet: 2, probability: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    pub probability: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModConfig {
    pub low: f32,
    pub high: f32,
}

impl Default for ModConfig {
    fn default() -> Self {
        Self { low: 0.0, high: 1.0 }
    }
}

/// Generation constraints for one track
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    pub pitch: PitchConfig,
    pub gate: GateConfig,
    pub velocity: VelocityConfig,
    pub gate_length: GateLengthConfig,
    pub ratchet: RatchetConfig,
    pub slide: SlideConfig,
    pub modulation: ModConfig,
}

fn ordered<T: PartialOrd + Copy>(a: T, b: T) -> (T, T) {
    if b < a { (b, a) } else { (a, b) }
}

fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

impl RandomConfig {
    /// Every range ordered and clamped to its legal domain
    pub fn clamped(&self) -> Self {
        let (pitch_low, pitch_high) = ordered(self.pitch.low.min(127), self.pitch.high.min(127));
        let (fill_min, fill_max) = ordered(unit(self.gate.fill_min), unit(self.gate.fill_max));
        let (vel_low, vel_high) = ordered(self.velocity.low.min(127), self.velocity.high.min(127));
        let (len_min, len_max) = ordered(
            self.gate_length.min.clamp(MIN_GATE_LENGTH, MAX_GATE_LENGTH),
            self.gate_length.max.clamp(MIN_GATE_LENGTH, MAX_GATE_LENGTH),
        );
        let (mod_low, mod_high) = ordered(unit(self.modulation.low), unit(self.modulation.high));

        Self {
            pitch: PitchConfig {
                low: pitch_low,
                high: pitch_high,
                root: self.pitch.root % 12,
                ..self.pitch
            },
            gate: GateConfig {
                fill_min,
                fill_max,
                smart_bars: self.gate.smart_bars.clamp(1, 16),
                ..self.gate
            },
            velocity: VelocityConfig { low: vel_low, high: vel_high },
            gate_length: GateLengthConfig { min: len_min, max: len_max },
            ratchet: RatchetConfig {
                max_ratchet: self.ratchet.max_ratchet.clamp(1, MAX_RATCHET),
                probability: unit(self.ratchet.probability),
            },
            slide: SlideConfig { probability: unit(self.slide.probability) },
            modulation: ModConfig { low: mod_low, high: mod_high },
        }
    }
}

/// On/off pattern for the gate lane
pub fn randomize_gates(config: &GateConfig, length: usize, seed: u32) -> Vec<bool> {
    if length == 0 {
        return vec![];
    }

    if config.mode == GateMode::Random && config.smart_bars > 1 {
        let params = SmartGateParams {
            fill_min: config.fill_min,
            fill_max: config.fill_max,
            steps_per_bar: length / config.smart_bars.min(length),
            bars: config.smart_bars,
            density: config.density,
            seed,
        };
        return generate_smart_gate_lane(&params, length);
    }

    let mut rng = Rng::new(seed);
    let (min_hits, max_hits) = hit_range(config.fill_min, config.fill_max, length);
    let hits = rng.range_inclusive(min_hits as i64, max_hits as i64) as usize;

    match config.mode {
        GateMode::Euclidean => {
            let pattern = euclidean(hits, length);
            if config.euclidean_offset {
                let offset = rng.index(length);
                rotate(&pattern, offset)
            } else {
                pattern
            }
        }
        GateMode::Random => scatter_hits(hits, length, &mut rng),
    }
}

/// Scale-constrained notes.
///
/// With `max_notes` set, a random subset of that many scale notes is chosen
/// first and every step draws from it. If no scale note falls in range,
/// every step gets `low`.
pub fn randomize_pitch(config: &PitchConfig, length: usize, seed: u32) -> Vec<u8> {
    let mut rng = Rng::new(seed);
    let (low, high) = ordered(config.low.min(127), config.high.min(127));
    let mut notes = scale_notes_in_range(config.root, config.scale, low, high);

    if notes.is_empty() {
        return vec![low; length];
    }

    if config.max_notes > 0 && config.max_notes < notes.len() {
        rng.shuffle(&mut notes);
        notes.truncate(config.max_notes);
        notes.sort_unstable();
    }

    (0..length)
        .map(|_| notes[rng.index(notes.len())])
        .collect()
}

pub fn randomize_velocity(config: &VelocityConfig, length: usize, seed: u32) -> Vec<u8> {
    let mut rng = Rng::new(seed);
    let (low, high) = ordered(config.low.min(127), config.high.min(127));
    (0..length)
        .map(|_| rng.range_inclusive(low as i64, high as i64) as u8)
        .collect()
}

/// Gate lengths on the 0.05 grid, within `[0.05, 1.0]`
pub fn randomize_gate_length(config: &GateLengthConfig, length: usize, seed: u32) -> Vec<f32> {
    let mut rng = Rng::new(seed);
    let (min, max) = ordered(config.min, config.max);
    let low = min.max(MIN_GATE_LENGTH) as f64;
    let high = max.min(MAX_GATE_LENGTH).max(MIN_GATE_LENGTH) as f64;
    (0..length)
        .map(|_| {
            let raw = rng.range_f64(low, high);
            (((raw * 20.0).round() / 20.0) as f32).clamp(MIN_GATE_LENGTH, MAX_GATE_LENGTH)
        })
        .collect()
}

/// 1 for plain steps, `2..=max_ratchet` where the Bernoulli draw hits
pub fn randomize_ratchet(config: &RatchetConfig, length: usize, seed: u32) -> Vec<u8> {
    let mut rng = Rng::new(seed);
    let max_ratchet = config.max_ratchet.min(MAX_RATCHET);
    (0..length)
        .map(|_| {
            if rng.chance(config.probability as f64) && max_ratchet >= 2 {
                rng.range_inclusive(2, max_ratchet as i64) as u8
            } else {
                1
            }
        })
        .collect()
}

pub fn randomize_slide(config: &SlideConfig, length: usize, seed: u32) -> Vec<f32> {
    let mut rng = Rng::new(seed);
    (0..length)
        .map(|_| if rng.chance(config.probability as f64) { RANDOM_SLIDE_TIME } else { 0.0 })
        .collect()
}

/// Mod values on the 0.01 grid
pub fn randomize_mod(config: &ModConfig, length: usize, seed: u32) -> Vec<f32> {
    let mut rng = Rng::new(seed);
    let (low, high) = ordered(unit(config.low) as f64, unit(config.high) as f64);
    (0..length)
        .map(|_| {
            let raw = rng.range_f64(low, high);
            (((raw * 100.0).round() / 100.0) as f32).clamp(0.0, 1.0)
        })
        .collect()
}

/// Raw per-parameter arrays for one track, ready to fold into steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomizedTrack {
    pub gates: Vec<bool>,
    pub gate_lengths: Vec<f32>,
    pub ratchets: Vec<u8>,
    pub pitches: Vec<u8>,
    pub slides: Vec<f32>,
    pub velocities: Vec<u8>,
    pub mods: Vec<f32>,
}

pub fn randomize_track(config: &RandomConfig, lengths: TrackLengths, seed: u32) -> RandomizedTrack {
    let seed_for = |offset: u32| seed.wrapping_add(offset);
    RandomizedTrack {
        gates: randomize_gates(&config.gate, lengths.gate, seed_for(GATE_SEED)),
        gate_lengths: randomize_gate_length(&config.gate_length, lengths.gate, seed_for(GATE_LENGTH_SEED)),
        ratchets: randomize_ratchet(&config.ratchet, lengths.gate, seed_for(RATCHET_SEED)),
        pitches: randomize_pitch(&config.pitch, lengths.pitch, seed_for(PITCH_SEED)),
        slides: randomize_slide(&config.slide, lengths.pitch, seed_for(SLIDE_SEED)),
        velocities: randomize_velocity(&config.velocity, lengths.velocity, seed_for(VELOCITY_SEED)),
        mods: randomize_mod(&config.modulation, lengths.modulation, seed_for(MOD_SEED)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDS: std::ops::Range<u32> = 0..64;

    #[test]
    fn test_gate_hit_count_within_fill() {
        let config = GateConfig { fill_min: 0.25, fill_max: 0.5, ..Default::default() };
        for seed in SEEDS {
            let gates = randomize_gates(&config, 16, seed);
            let hits = gates.iter().filter(|&&g| g).count();
            assert_eq!(gates.len(), 16);
            assert!((4..=8).contains(&hits), "seed {seed}: {hits} hits");
        }
    }

    #[test]
    fn test_euclidean_gates_without_offset() {
        let config = GateConfig {
            fill_min: 0.25,
            fill_max: 0.25,
            mode: GateMode::Euclidean,
            ..Default::default()
        };
        assert_eq!(randomize_gates(&config, 16, 5), euclidean(4, 16));
    }

    #[test]
    fn test_euclidean_gates_with_offset_is_rotation() {
        let config = GateConfig {
            fill_min: 0.375,
            fill_max: 0.375,
            mode: GateMode::Euclidean,
            euclidean_offset: true,
            ..Default::default()
        };
        let base = euclidean(3, 8);
        for seed in SEEDS {
            let gates = randomize_gates(&config, 8, seed);
            assert!((0..8).any(|r| rotate(&base, r) == gates), "seed {seed}");
        }
    }

    #[test]
    fn test_smart_bars_shape_gates() {
        let config = GateConfig {
            fill_min: 0.0,
            fill_max: 1.0,
            smart_bars: 2,
            density: SmartDensity::Build,
            ..Default::default()
        };
        let gates = randomize_gates(&config, 16, 3);
        assert_eq!(gates.len(), 16);
        assert!(gates[..8].iter().all(|&g| !g));
        assert!(gates[8..].iter().all(|&g| g));
    }

    #[test]
    fn test_smart_bars_fill_every_lane_length() {
        for density in SmartDensity::ALL {
            let config = GateConfig { fill_min: 0.25, fill_max: 1.0, density, ..Default::default() };
            for smart_bars in 1..=16 {
                for length in 1..=64 {
                    for seed in 0..4 {
                        let gates = randomize_gates(&GateConfig { smart_bars, ..config }, length, seed);
                        let hits = gates.iter().filter(|&&g| g).count();
                        let (lo, hi) = hit_range(0.25, 1.0, length);
                        assert_eq!(gates.len(), length);
                        assert!(
                            (lo..=hi).contains(&hits),
                            "{density} bars {smart_bars} length {length} seed {seed}: {hits} hits"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_smart_bars_longer_than_lane() {
        let config = GateConfig {
            fill_min: 0.25,
            fill_max: 1.0,
            smart_bars: 8,
            density: SmartDensity::Build,
            ..Default::default()
        };
        let gates = randomize_gates(&config, 4, 0);
        assert_eq!(gates.len(), 4);
        assert!(gates.iter().any(|&g| g));
    }

    #[test]
    fn test_pitch_in_scale_and_range() {
        let config = PitchConfig { low: 40, high: 80, scale: ScaleMode::Dorian, root: 2, max_notes: 0 };
        for seed in SEEDS {
            for note in randomize_pitch(&config, 32, seed) {
                assert!((40..=80).contains(&note));
                assert!(ScaleMode::Dorian.contains(2, note));
            }
        }
    }

    #[test]
    fn test_pitch_max_notes_limits_distinct() {
        let config = PitchConfig { max_notes: 3, ..Default::default() };
        for seed in SEEDS {
            let mut notes = randomize_pitch(&config, 64, seed);
            notes.sort_unstable();
            notes.dedup();
            assert!(notes.len() <= 3, "seed {seed}: {notes:?}");
        }
    }

    #[test]
    fn test_pitch_empty_scale_falls_back_to_low() {
        // C# alone is not in C major
        let config = PitchConfig { low: 61, high: 61, scale: ScaleMode::Major, root: 0, max_notes: 0 };
        assert_eq!(randomize_pitch(&config, 4, 1), vec![61; 4]);
    }

    #[test]
    fn test_velocity_range() {
        let config = VelocityConfig { low: 90, high: 100 };
        for seed in SEEDS {
            assert!(randomize_velocity(&config, 16, seed).iter().all(|v| (90..=100).contains(v)));
        }
    }

    #[test]
    fn test_gate_length_range_and_grid() {
        let config = GateLengthConfig { min: 0.0, max: 3.0 };
        for seed in SEEDS {
            for len in randomize_gate_length(&config, 16, seed) {
                assert!((MIN_GATE_LENGTH..=MAX_GATE_LENGTH).contains(&len));
                let grid = len * 20.0;
                assert!((grid - grid.round()).abs() < 1e-4, "{len} off grid");
            }
        }
        let narrow = GateLengthConfig { min: 0.25, max: 0.5 };
        assert!(randomize_gate_length(&narrow, 64, 9).iter().all(|l| (0.25..=0.5).contains(l)));
    }

    #[test]
    fn test_ratchet_values() {
        let always = RatchetConfig { max_ratchet: 4, probability: 1.0 };
        assert!(randomize_ratchet(&always, 32, 1).iter().all(|r| (2..=4).contains(r)));
        let never = RatchetConfig { max_ratchet: 4, probability: 0.0 };
        assert_eq!(randomize_ratchet(&never, 8, 1), vec![1; 8]);
        let capped = RatchetConfig { max_ratchet: 1, probability: 1.0 };
        assert_eq!(randomize_ratchet(&capped, 8, 1), vec![1; 8]);
    }

    #[test]
    fn test_slide_values() {
        let always = SlideConfig { probability: 1.0 };
        assert_eq!(randomize_slide(&always, 4, 0), vec![RANDOM_SLIDE_TIME; 4]);
        let never = SlideConfig::default();
        assert_eq!(randomize_slide(&never, 4, 0), vec![0.0; 4]);
    }

    #[test]
    fn test_mod_range_and_grid() {
        let config = ModConfig { low: 0.2, high: 0.4 };
        for v in randomize_mod(&config, 64, 12) {
            assert!((0.2..=0.4).contains(&v));
            assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_randomize_track_deterministic() {
        let config = RandomConfig::default();
        let lengths = TrackLengths { gate: 16, pitch: 7, velocity: 5, modulation: 12 };
        let a = randomize_track(&config, lengths, 1000);
        let b = randomize_track(&config, lengths, 1000);
        assert_eq!(a, b);
        assert_eq!(a.gates.len(), 16);
        assert_eq!(a.ratchets.len(), 16);
        assert_eq!(a.pitches.len(), 7);
        assert_eq!(a.slides.len(), 7);
        assert_eq!(a.velocities.len(), 5);
        assert_eq!(a.mods.len(), 12);

        let c = randomize_track(&config, lengths, 1001);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derived_seeds_isolate_parameters() {
        let base = RandomConfig::default();
        let mut tweaked = base;
        tweaked.velocity = VelocityConfig { low: 1, high: 10 };
        let lengths = TrackLengths::uniform(16);
        let a = randomize_track(&base, lengths, 55);
        let b = randomize_track(&tweaked, lengths, 55);
        assert_eq!(a.gates, b.gates);
        assert_eq!(a.pitches, b.pitches);
        assert_ne!(a.velocities, b.velocities);
    }

    #[test]
    fn test_clamped_orders_ranges() {
        let config = RandomConfig {
            pitch: PitchConfig { low: 200, high: 30, root: 14, ..Default::default() },
            gate: GateConfig { fill_min: 1.5, fill_max: -1.0, smart_bars: 0, ..Default::default() },
            ratchet: RatchetConfig { max_ratchet: 9, probability: 2.0 },
            ..Default::default()
        }
        .clamped();
        assert_eq!((config.pitch.low, config.pitch.high), (30, 127));
        assert_eq!(config.pitch.root, 2);
        assert_eq!((config.gate.fill_min, config.gate.fill_max), (0.0, 1.0));
        assert_eq!(config.gate.smart_bars, 1);
        assert_eq!(config.ratchet.max_ratchet, 4);
        assert_eq!(config.ratchet.probability, 1.0);
    }

    #[test]
    fn test_gate_mode_parse() {
        assert_eq!("euclid".parse::<GateMode>(), Ok(GateMode::Euclidean));
        assert_eq!("Random".parse::<GateMode>(), Ok(GateMode::Random));
        assert!("dense".parse::<GateMode>().is_err());
    }
}
