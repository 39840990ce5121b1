//! Error types for tetra

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TetraError {
    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },
    #[error("Track not found: {0}")]
    TrackNotFound(usize),
    #[error("Output not found: {0}")]
    OutputNotFound(usize),
    #[error("Step {step} out of range for {lane} lane of length {length}")]
    StepOutOfRange { lane: &'static str, step: usize, length: usize },
}

impl TetraError {
    pub(crate) fn unknown(kind: &'static str, name: &str) -> Self {
        Self::UnknownName { kind, name: name.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, TetraError>;
