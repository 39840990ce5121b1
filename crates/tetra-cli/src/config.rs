//! Session configuration loaded from TOML

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tetra_core::{factory_preset, ArpConfig, LfoConfig, MutateConfig, RandomConfig, SubtrackId, TransposeConfig};
use tetra_services::Command;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base seed; track `i` is randomized from `seed + i`
    pub seed: u32,
    pub bpm: f64,
    /// Master ticks to play before exiting
    pub ticks: u64,
    /// Play through the clock thread instead of rendering offline
    pub realtime: bool,
    /// Print JSON lines instead of text
    pub json: bool,
    #[serde(rename = "track")]
    pub tracks: Vec<TrackConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            bpm: 120.0,
            ticks: 64,
            realtime: false,
            json: false,
            tracks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Factory preset name
    pub preset: Option<String>,
    /// Explicit randomizer config, applied after `preset`
    pub random: Option<RandomConfig>,
    pub gate_length: Option<usize>,
    pub pitch_length: Option<usize>,
    pub velocity_length: Option<usize>,
    pub mod_length: Option<usize>,
    pub clock_divider: Option<u32>,
    pub drift: Option<MutateConfig>,
    pub lfo: Option<LfoConfig>,
    pub arp: Option<ArpConfig>,
    pub transpose: Option<TransposeConfig>,
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tetra")
        .join("config.toml")
}

pub fn parse_config(source: &str) -> Result<SessionConfig> {
    toml::from_str(source).context("Invalid session config")
}

/// Config at `path`, or defaults when it is missing or malformed
pub fn load_config(path: &Path) -> SessionConfig {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::info!(path = %path.display(), error = %e, "No session config, using defaults");
            return SessionConfig::default();
        }
    };
    match parse_config(&source) {
        Ok(config) => {
            tracing::info!(path = %path.display(), tracks = config.tracks.len(), "Session config loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed session config, using defaults");
            SessionConfig::default()
        }
    }
}

impl TrackConfig {
    /// Commands that shape track `track`, in the order they must run
    fn commands(&self, track: usize, seed: u32) -> Result<Vec<Command>> {
        let mut commands = Vec::new();

        if let Some(name) = &self.preset {
            let preset = factory_preset(name).with_context(|| format!("Track {}", track + 1))?;
            commands.push(Command::ApplyPreset { track, preset });
        }
        if let Some(config) = self.random {
            commands.push(Command::SetRandomConfig { track, config });
        }

        let lengths = [
            (SubtrackId::Gate, self.gate_length),
            (SubtrackId::Pitch, self.pitch_length),
            (SubtrackId::Velocity, self.velocity_length),
            (SubtrackId::Mod, self.mod_length),
        ];
        for (subtrack, length) in lengths {
            if let Some(length) = length {
                commands.push(Command::SetSubtrackLength { track, subtrack, length });
            }
        }
        if let Some(divider) = self.clock_divider {
            commands.push(Command::SetTrackClockDivider { track, divider });
        }

        commands.push(Command::Randomize { track, seed });

        if let Some(config) = self.lfo {
            commands.push(Command::SetLfoConfig { track, config: Some(config) });
            commands.push(Command::ApplyLfo { track });
        }
        if let Some(config) = self.arp {
            commands.push(Command::SetArpConfig { track, config: Some(config) });
            commands.push(Command::ApplyArp { track });
        }
        if let Some(config) = self.drift {
            commands.push(Command::SetMutateConfig { track, config });
        }
        if let Some(config) = self.transpose {
            commands.push(Command::SetTransposeConfig { track, config });
        }
        Ok(commands)
    }
}

impl SessionConfig {
    /// Every command needed to turn a fresh sequencer into this session
    pub fn commands(&self) -> Result<Vec<Command>> {
        let mut commands = vec![Command::SetBpm(self.bpm), Command::SetDriftSeed(self.seed)];
        let default_track = TrackConfig::default();
        for track in 0..tetra_core::NUM_TRACKS {
            let config = self.tracks.get(track).unwrap_or(&default_track);
            commands.extend(config.commands(track, self.seed.wrapping_add(track as u32))?);
        }
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::{MutateTrigger, ScaleMode};

    const SAMPLE: &str = r#"
seed = 42
bpm = 96.0
ticks = 32
json = true

[[track]]
preset = "Acid Line"
gate_length = 12
clock_divider = 2

[track.drift]
trigger = "Bars"
bars = 2
pitch = 0.25

[[track]]
pitch_length = 5

[track.arp]
root = 50
scale = "Dorian"
direction = "Triangle"
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.bpm, 96.0);
        assert!(config.json);
        assert!(!config.realtime);
        assert_eq!(config.tracks.len(), 2);
        assert_eq!(config.tracks[0].gate_length, Some(12));

        let drift = config.tracks[0].drift.unwrap();
        assert_eq!(drift.trigger, MutateTrigger::Bars);
        assert_eq!(drift.gate, 0.0);

        let arp = config.tracks[1].arp.unwrap();
        assert_eq!(arp.scale, ScaleMode::Dorian);
        assert_eq!(arp.octave_range, 1);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse_config("").unwrap(), SessionConfig::default());
        assert!(parse_config("ticks = \"many\"").is_err());
    }

    #[test]
    fn test_commands_randomize_every_track() {
        let config = parse_config(SAMPLE).unwrap();
        let commands = config.commands().unwrap();
        let seeds: Vec<(usize, u32)> = commands
            .iter()
            .filter_map(|c| match c {
                Command::Randomize { track, seed } => Some((*track, *seed)),
                _ => None,
            })
            .collect();
        assert_eq!(seeds, vec![(0, 42), (1, 43), (2, 44), (3, 45)]);
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        let config = parse_config("[[track]]\npreset = \"Polka\"").unwrap();
        assert!(config.commands().is_err());
    }

    #[test]
    fn test_sample_session_parses() {
        let config = parse_config(include_str!("../session.sample.toml")).unwrap();
        assert_eq!(config.seed, 42);
        assert!(!config.json);
        assert_eq!(config.tracks[0].preset.as_deref(), Some("Acid Line"));
        assert_eq!(config.tracks[1].arp.unwrap().scale, ScaleMode::Dorian);
        assert!(config.commands().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = load_config(Path::new("/nonexistent/tetra/config.toml"));
        assert_eq!(config, SessionConfig::default());
    }
}
