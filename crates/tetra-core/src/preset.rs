//! Named randomizer presets

use serde::{Deserialize, Serialize};

use crate::error::{Result, TetraError};
use crate::random::{
    GateConfig, GateLengthConfig, GateMode, ModConfig, PitchConfig, RandomConfig, RatchetConfig,
    SlideConfig, VelocityConfig,
};
use crate::scale::ScaleMode;
use crate::smart_gate::SmartDensity;

/// A randomizer config under a name; hosts store it as an opaque blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub config: RandomConfig,
}

impl Preset {
    pub fn new(name: impl Into<String>, config: RandomConfig) -> Self {
        Self { name: name.into(), config }
    }
}

/// Built-in presets, always available
pub fn factory_presets() -> Vec<Preset> {
    let base = RandomConfig::default();
    vec![
        Preset::new("Default", base),
        Preset::new(
            "Four On Floor",
            RandomConfig {
                gate: GateConfig { fill_min: 0.25, fill_max: 0.25, mode: GateMode::Euclidean, ..base.gate },
                velocity: VelocityConfig { low: 110, high: 127 },
                gate_length: GateLengthConfig { min: 0.25, max: 0.35 },
                pitch: PitchConfig { low: 36, high: 43, max_notes: 1, ..base.pitch },
                ..base
            },
        ),
        Preset::new(
            "Acid Line",
            RandomConfig {
                pitch: PitchConfig { low: 36, high: 60, scale: ScaleMode::Phrygian, root: 9, max_notes: 5 },
                gate: GateConfig { fill_min: 0.5, fill_max: 0.75, ..base.gate },
                gate_length: GateLengthConfig { min: 0.3, max: 0.9 },
                slide: SlideConfig { probability: 0.3 },
                ratchet: RatchetConfig { max_ratchet: 2, probability: 0.1 },
                ..base
            },
        ),
        Preset::new(
            "Ambient Drift",
            RandomConfig {
                pitch: PitchConfig { low: 55, high: 84, scale: ScaleMode::Lydian, root: 2, max_notes: 0 },
                gate: GateConfig { fill_min: 0.1, fill_max: 0.25, ..base.gate },
                velocity: VelocityConfig { low: 40, high: 90 },
                gate_length: GateLengthConfig { min: 0.75, max: 1.0 },
                slide: SlideConfig { probability: 0.5 },
                modulation: ModConfig { low: 0.2, high: 0.8 },
                ..base
            },
        ),
        Preset::new(
            "Broken Beat",
            RandomConfig {
                gate: GateConfig {
                    fill_min: 0.25,
                    fill_max: 0.6,
                    smart_bars: 4,
                    density: SmartDensity::Variation,
                    ..base.gate
                },
                ratchet: RatchetConfig { max_ratchet: 4, probability: 0.2 },
                velocity: VelocityConfig { low: 70, high: 127 },
                ..base
            },
        ),
        Preset::new(
            "Arp Pulse",
            RandomConfig {
                pitch: PitchConfig { low: 48, high: 72, scale: ScaleMode::MinorPentatonic, root: 0, max_notes: 4 },
                gate: GateConfig { fill_min: 0.5, fill_max: 0.5, mode: GateMode::Euclidean, euclidean_offset: true, ..base.gate },
                gate_length: GateLengthConfig { min: 0.2, max: 0.4 },
                ..base
            },
        ),
    ]
}

/// Case-insensitive lookup of a built-in preset
pub fn factory_preset(name: &str) -> Result<Preset> {
    let wanted = name.trim();
    factory_presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| TetraError::unknown("preset", name))
}
