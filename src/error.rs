//! Error Types
//!
//! Validation failures raised before any state is touched.

use std::path::PathBuf;

/// Rejected input to a [`DecayedVector`](crate::DecayedVector) operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecayError {
    #[error("invalid half-life: {0} days (must be finite and > 0)")]
    InvalidHalfLife(f64),

    #[error("invalid weight sum: {0} (must be finite and >= 0)")]
    InvalidWeightSum(f64),

    #[error("invalid base weight: {0} (must be finite and > 0)")]
    InvalidBaseWeight(f64),

    #[error("invalid decay skip window: {0}s (must be finite and >= 0)")]
    InvalidSkipWindow(f64),

    #[error("embedding must have at least one dimension")]
    EmptyEmbedding,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("non-finite vector component at index {index}")]
    NonFiniteComponent { index: usize },
}

pub type Result<T> = std::result::Result<T, DecayError>;

/// Failure while loading a [`DecayConfig`](crate::DecayConfig) from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] DecayError),
}

/// Index of the first non-finite component, if any.
pub(crate) fn first_non_finite(values: &[f32]) -> Option<usize> {
    values.iter().position(|v| !v.is_finite())
}
