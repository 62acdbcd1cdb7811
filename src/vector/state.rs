//! Persisted Vector State
//!
//! The `(embedding, weight_sum, updated_at)` triple handed to and received
//! from the caller's storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a [`DecayedVector`](super::DecayedVector)'s mutable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorState {
    /// Running decay-weighted average
    pub embedding: Vec<f32>,
    /// Effective mass behind `embedding` as of `updated_at`
    pub weight_sum: f64,
    /// Time of the last mutation
    pub updated_at: DateTime<Utc>,
}

impl VectorState {
    /// Fresh state for an entity with no history.
    pub fn empty(dimension: usize, now: DateTime<Utc>) -> Self {
        Self {
            embedding: vec![0.0; dimension],
            weight_sum: 0.0,
            updated_at: now,
        }
    }

    /// Get embedding dimension
    pub fn dim(&self) -> usize {
        self.embedding.len()
    }
}
