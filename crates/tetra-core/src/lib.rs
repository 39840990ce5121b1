//! tetra-core: 4-track polymetric step-sequencing engine
//!
//! Everything in this crate is pure and deterministic: operations borrow a
//! `SequencerState` and return a new one, and every generator reproduces
//! its output from an integer seed.

pub mod arp;
pub mod clock;
mod error;
pub mod euclidean;
pub mod lfo;
pub mod mutate;
pub mod preset;
pub mod random;
pub mod rng;
pub mod routing;
pub mod scale;
pub mod sequencer;
pub mod smart_gate;
pub mod track;
mod transport;

pub use arp::{generate_arp_pattern, get_chord_notes, ArpConfig, ArpDirection};
pub use error::{Result, TetraError};
pub use euclidean::{euclidean, rotate};
pub use lfo::{generate_lfo_pattern, lfo_value, LfoConfig, LfoWaveform};
pub use mutate::{drift_boundary, is_mutate_active, mutate_track, MutateConfig, MutateTrigger};
pub use preset::{factory_preset, factory_presets, Preset};
pub use random::{randomize_track, GateMode, RandomConfig, RandomizedTrack};
pub use rng::Rng;
pub use routing::{resolve_outputs, NoteEvent, OutputRouting, ScaleLock, TransposeConfig, NUM_OUTPUTS};
pub use scale::{note_name, quantize_to_scale, scale_notes_in_range, ScaleMode};
pub use sequencer::{create_sequencer, tick, SequencerState, TickResult, NUM_TRACKS};
pub use smart_gate::{bar_sizes, generate_smart_gate_lane, generate_smart_gate_pattern, SmartDensity, SmartGateParams};
pub use track::{GateStep, MuteTrack, PitchStep, Subtrack, SubtrackId, Track, TrackLengths};
pub use transport::{clamp_bpm, Transport};
