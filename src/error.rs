//! Error types for the scoring engine

use thiserror::Error;

/// Errors that can cross the engine boundary.
///
/// Only input-contract violations reach the caller of
/// [`ScoringEngine::analyze`](crate::engine::ScoringEngine::analyze); every
/// other anomaly is absorbed and surfaced as an elevated risk signal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("invalid scoring request: {0}")]
    Validation(String),

    #[error("model layer {layer} has shape {actual:?}, expected {expected:?}")]
    ModelShape {
        layer: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("pattern model produced a non-finite score: {0}")]
    NonFiniteScore(f64),

    #[error("invalid engine configuration: {0}")]
    Config(String),
}

/// Failures of the injected reputation lookup collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("reputation provider unavailable: {0}")]
    Unavailable(String),

    #[error("reputation provider panicked: {0}")]
    Panicked(String),

    #[error("reputation lookup timed out after {0} ms")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, ScoringError>;
