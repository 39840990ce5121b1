//! Scale definitions and pitch-to-scale helpers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TetraError;

/// Scale/mode types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScaleMode {
    Major,
    #[default]
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
    Chromatic,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 14] = [
        ScaleMode::Major,
        ScaleMode::Minor,
        ScaleMode::Dorian,
        ScaleMode::Phrygian,
        ScaleMode::Lydian,
        ScaleMode::Mixolydian,
        ScaleMode::Locrian,
        ScaleMode::HarmonicMinor,
        ScaleMode::MelodicMinor,
        ScaleMode::MajorPentatonic,
        ScaleMode::MinorPentatonic,
        ScaleMode::Blues,
        ScaleMode::WholeTone,
        ScaleMode::Chromatic,
    ];

    /// Get scale intervals (semitones from root)
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11],
            Self::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Self::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Self::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Self::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Self::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Self::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Self::MajorPentatonic => &[0, 2, 4, 7, 9],
            Self::MinorPentatonic => &[0, 3, 5, 7, 10],
            Self::Blues => &[0, 3, 5, 6, 7, 10],
            Self::WholeTone => &[0, 2, 4, 6, 8, 10],
            Self::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Dorian => "Dorian",
            Self::Phrygian => "Phrygian",
            Self::Lydian => "Lydian",
            Self::Mixolydian => "Mixolydian",
            Self::Locrian => "Locrian",
            Self::HarmonicMinor => "Harmonic Minor",
            Self::MelodicMinor => "Melodic Minor",
            Self::MajorPentatonic => "Major Pentatonic",
            Self::MinorPentatonic => "Minor Pentatonic",
            Self::Blues => "Blues",
            Self::WholeTone => "Whole Tone",
            Self::Chromatic => "Chromatic",
        }
    }

    /// True if `note` belongs to this scale built on pitch class `root`
    pub fn contains(&self, root: u8, note: u8) -> bool {
        let relative = (note as i16 - root as i16).rem_euclid(12) as u8;
        self.intervals().contains(&relative)
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleMode {
    type Err = TetraError;

    /// Accepts display names with any case, spaces, dashes or underscores
    /// ("harmonic-minor", "Harmonic Minor", "harmonicminor").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|mode| normalize(mode.name()) == wanted)
            .ok_or_else(|| TetraError::unknown("scale", s))
    }
}

pub(crate) fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Every MIDI note in `[low, high]` that belongs to `scale` on pitch class `root`.
///
/// Bounds are swapped if given in the wrong order and clamped to 0..=127.
pub fn scale_notes_in_range(root: u8, scale: ScaleMode, low: u8, high: u8) -> Vec<u8> {
    let (low, high) = (low.min(high).min(127), high.max(low).min(127));
    (low..=high).filter(|&note| scale.contains(root, note)).collect()
}

/// Quantize a note to the nearest scale note (ties resolve downward)
pub fn quantize_to_scale(note: u8, root: u8, scale: ScaleMode) -> u8 {
    let note = note.min(127);
    if scale.contains(root, note) {
        return note;
    }

    for distance in 1..12i16 {
        let below = note as i16 - distance;
        if below >= 0 && scale.contains(root, below as u8) {
            return below as u8;
        }
        let above = note as i16 + distance;
        if above <= 127 && scale.contains(root, above as u8) {
            return above as u8;
        }
    }
    note
}

/// Scientific pitch name, middle C (60) = "C4"
pub fn note_name(note: u8) -> String {
    const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = note as i16 / 12 - 1;
    format!("{}{}", NAMES[(note % 12) as usize], octave)
}
