//! Chord-tone arpeggiator for the pitch lane

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TetraError;
use crate::rng::Rng;
use crate::scale::{normalize, ScaleMode};

/// Scale degrees picked as chord tones: root, 3rd, 5th, 7th
const CHORD_DEGREES: [usize; 4] = [0, 2, 4, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArpDirection {
    #[default]
    Up,
    Down,
    /// Up then down without repeating the turnaround notes
    Triangle,
    Random,
}

impl ArpDirection {
    pub const ALL: [ArpDirection; 4] = [
        ArpDirection::Up,
        ArpDirection::Down,
        ArpDirection::Triangle,
        ArpDirection::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Triangle => "Triangle",
            Self::Random => "Random",
        }
    }
}

impl fmt::Display for ArpDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArpDirection {
    type Err = TetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|d| normalize(d.name()) == wanted)
            .ok_or_else(|| TetraError::unknown("arp direction", s))
    }
}

/// Arpeggiator settings for one track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpConfig {
    /// MIDI note of the chord root
    pub root: u8,
    pub scale: ScaleMode,
    pub direction: ArpDirection,
    pub octave_range: u8,
    pub seed: u32,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            root: 48,
            scale: ScaleMode::Minor,
            direction: ArpDirection::Up,
            octave_range: 1,
            seed: 0,
        }
    }
}

impl ArpConfig {
    pub fn clamped(&self) -> Self {
        Self {
            root: self.root.min(127),
            octave_range: self.octave_range.clamp(1, 4),
            ..*self
        }
    }
}

/// Root/3rd/5th/7th of `scale` built on `root`, fewer for short scales
pub fn get_chord_notes(root: u8, scale: ScaleMode) -> Vec<i16> {
    let intervals = scale.intervals();
    CHORD_DEGREES
        .iter()
        .filter_map(|&degree| intervals.get(degree))
        .map(|&interval| root as i16 + interval as i16)
        .collect()
}

/// Arpeggiated notes for `length` steps
pub fn generate_arp_pattern(
    root: u8,
    scale: ScaleMode,
    direction: ArpDirection,
    octave_range: u8,
    length: usize,
    seed: u32,
) -> Vec<u8> {
    let chord = get_chord_notes(root, scale);
    let octaves = octave_range.max(1) as i16;

    let mut tones: Vec<i16> = Vec::with_capacity(chord.len() * octaves as usize);
    for octave in 0..octaves {
        tones.extend(chord.iter().map(|&note| note + octave * 12));
    }
    if tones.is_empty() || length == 0 {
        return vec![];
    }

    let sequence: Vec<i16> = match direction {
        ArpDirection::Up | ArpDirection::Random => tones.clone(),
        ArpDirection::Down => tones.iter().rev().copied().collect(),
        ArpDirection::Triangle => {
            let mut cycle = tones.clone();
            if tones.len() > 2 {
                cycle.extend(tones[1..tones.len() - 1].iter().rev());
            }
            cycle
        }
    };

    let mut rng = Rng::new(seed);
    (0..length)
        .map(|i| {
            let note = match direction {
                ArpDirection::Random => sequence[rng.index(sequence.len())],
                _ => sequence[i % sequence.len()],
            };
            note.clamp(0, 127) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_notes() {
        // C minor 7: C Eb G Bb
        assert_eq!(get_chord_notes(48, ScaleMode::Minor), vec![48, 51, 55, 58]);
        // Pentatonic has 5 degrees: picks 0, 2, 4 only
        assert_eq!(get_chord_notes(60, ScaleMode::MajorPentatonic), vec![60, 64, 69]);
    }

    #[test]
    fn test_up_and_down() {
        let up = generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Up, 1, 6, 0);
        assert_eq!(up, vec![48, 51, 55, 58, 48, 51]);
        let down = generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Down, 1, 5, 0);
        assert_eq!(down, vec![58, 55, 51, 48, 58]);
    }

    #[test]
    fn test_triangle_skips_turnarounds() {
        let tri = generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Triangle, 1, 12, 0);
        assert_eq!(tri, vec![48, 51, 55, 58, 55, 51, 48, 51, 55, 58, 55, 51]);
    }

    #[test]
    fn test_octave_range() {
        let up = generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Up, 2, 8, 0);
        assert_eq!(up, vec![48, 51, 55, 58, 60, 63, 67, 70]);
    }

    #[test]
    fn test_random_draws_chord_tones() {
        let tones = [48u8, 51, 55, 58, 60, 63, 67, 70];
        let a = generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Random, 2, 32, 11);
        assert!(a.iter().all(|n| tones.contains(n)));
        assert_eq!(a, generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Random, 2, 32, 11));
        assert_ne!(a, generate_arp_pattern(48, ScaleMode::Minor, ArpDirection::Random, 2, 32, 12));
    }

    #[test]
    fn test_clamped_to_midi_range() {
        let high = generate_arp_pattern(120, ScaleMode::Major, ArpDirection::Up, 4, 16, 0);
        assert!(high.iter().all(|&n| n <= 127));
        assert!(high.contains(&127));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("triangle".parse::<ArpDirection>(), Ok(ArpDirection::Triangle));
        assert!("sideways".parse::<ArpDirection>().is_err());
    }
}
