//! LFO waveforms sampled onto the MOD lane

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TetraError;
use crate::rng::Rng;
use crate::scale::normalize;

/// Anchor points for the slewed-random shape, spread evenly over one cycle
const SLEW_ANCHORS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    SlewRandom,
}

impl LfoWaveform {
    pub const ALL: [LfoWaveform; 4] = [
        LfoWaveform::Sine,
        LfoWaveform::Triangle,
        LfoWaveform::Saw,
        LfoWaveform::SlewRandom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sine => "Sine",
            Self::Triangle => "Triangle",
            Self::Saw => "Saw",
            Self::SlewRandom => "Slew Random",
        }
    }
}

impl fmt::Display for LfoWaveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LfoWaveform {
    type Err = TetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|w| normalize(w.name()) == wanted)
            .ok_or_else(|| TetraError::unknown("waveform", s))
    }
}

/// LFO settings for one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfoConfig {
    pub waveform: LfoWaveform,
    /// Steps per cycle
    pub rate: usize,
    pub depth: f32,
    /// Centre value the wave swings around
    pub offset: f32,
    pub seed: u32,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Sine,
            rate: 16,
            depth: 1.0,
            offset: 0.5,
            seed: 0,
        }
    }
}

impl LfoConfig {
    pub fn clamped(&self) -> Self {
        Self {
            rate: self.rate.clamp(1, 64),
            depth: self.depth.clamp(0.0, 1.0),
            offset: self.offset.clamp(0.0, 1.0),
            ..*self
        }
    }
}

/// Raw waveform value in `[0, 1]` at `phase` in `[0, 1]`
pub fn lfo_value(waveform: LfoWaveform, phase: f64, seed: u32) -> f64 {
    let phase = phase.clamp(0.0, 1.0);
    match waveform {
        LfoWaveform::Sine => 0.5 + 0.5 * (TAU * phase).sin(),
        LfoWaveform::Triangle => {
            if phase < 0.5 {
                phase * 2.0
            } else {
                2.0 - phase * 2.0
            }
        }
        LfoWaveform::Saw => phase,
        LfoWaveform::SlewRandom => {
            let mut rng = Rng::new(seed);
            let anchors: Vec<f64> = (0..SLEW_ANCHORS).map(|_| rng.next_f64()).collect();
            let segments = (SLEW_ANCHORS - 1) as f64;
            let position = phase * segments;
            let index = (position.floor() as usize).min(SLEW_ANCHORS - 2);
            let frac = position - index as f64;
            anchors[index] + (anchors[index + 1] - anchors[index]) * frac
        }
    }
}

/// MOD values for `length` steps, one LFO cycle every `rate` steps
pub fn generate_lfo_pattern(config: &LfoConfig, length: usize) -> Vec<f32> {
    let rate = config.rate.max(1);
    (0..length)
        .map(|i| {
            let phase = (i % rate) as f64 / rate as f64;
            let raw = lfo_value(config.waveform, phase, config.seed);
            let value = config.offset as f64 + (raw - 0.5) * config.depth as f64;
            (((value * 100.0).round() / 100.0) as f32).clamp(0.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_basic_shapes() {
        assert!(close(lfo_value(LfoWaveform::Sine, 0.0, 0), 0.5));
        assert!(close(lfo_value(LfoWaveform::Sine, 0.25, 0), 1.0));
        assert!(close(lfo_value(LfoWaveform::Sine, 0.75, 0), 0.0));
        assert!(close(lfo_value(LfoWaveform::Triangle, 0.25, 0), 0.5));
        assert!(close(lfo_value(LfoWaveform::Triangle, 0.5, 0), 1.0));
        assert!(close(lfo_value(LfoWaveform::Triangle, 0.75, 0), 0.5));
        assert!(close(lfo_value(LfoWaveform::Saw, 0.3, 0), 0.3));
    }

    #[test]
    fn test_slew_random_hits_anchors() {
        let mut rng = Rng::new(21);
        let first = rng.next_f64();
        let second = rng.next_f64();
        assert!(close(lfo_value(LfoWaveform::SlewRandom, 0.0, 21), first));
        assert!(close(lfo_value(LfoWaveform::SlewRandom, 0.125, 21), second));
        // Halfway between the first two anchors
        assert!(close(lfo_value(LfoWaveform::SlewRandom, 0.0625, 21), (first + second) / 2.0));
        for i in 0..=100 {
            let v = lfo_value(LfoWaveform::SlewRandom, i as f64 / 100.0, 21);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_pattern_saw_cycles_with_rate() {
        let config = LfoConfig { waveform: LfoWaveform::Saw, rate: 4, depth: 1.0, offset: 0.5, seed: 0 };
        assert_eq!(
            generate_lfo_pattern(&config, 8),
            vec![0.0, 0.25, 0.5, 0.75, 0.0, 0.25, 0.5, 0.75]
        );
    }

    #[test]
    fn test_pattern_depth_and_offset() {
        let config = LfoConfig { waveform: LfoWaveform::Saw, rate: 2, depth: 0.5, offset: 0.2, seed: 0 };
        // 0.2 + (0 - 0.5) * 0.5 = -0.05 -> clamped to 0; 0.2 + 0 = 0.2
        assert_eq!(generate_lfo_pattern(&config, 2), vec![0.0, 0.2]);
    }

    #[test]
    fn test_pattern_range_and_determinism() {
        for waveform in LfoWaveform::ALL {
            let config = LfoConfig { waveform, rate: 7, seed: 5, ..Default::default() };
            let pattern = generate_lfo_pattern(&config, 64);
            assert_eq!(pattern, generate_lfo_pattern(&config, 64));
            assert!(pattern.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_slew_random_seed_changes_pattern() {
        let config = LfoConfig { waveform: LfoWaveform::SlewRandom, seed: 5, ..Default::default() };
        let other = LfoConfig { seed: 6, ..config };
        assert_ne!(generate_lfo_pattern(&config, 16), generate_lfo_pattern(&other, 16));
    }

    #[test]
    fn test_waveform_parse() {
        assert_eq!("slew-random".parse::<LfoWaveform>(), Ok(LfoWaveform::SlewRandom));
        assert_eq!("tri angle".parse::<LfoWaveform>(), Ok(LfoWaveform::Triangle));
        assert!("square".parse::<LfoWaveform>().is_err());
    }
}
