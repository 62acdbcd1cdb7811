//! DECAYVEC - Time-Decayed Preference Embeddings
//!
//! Keeps one embedding per entity as a running weighted average of event
//! embeddings, where each event's influence halves every configured
//! half-life. State is `(embedding, weight_sum, updated_at)`; snapshots at
//! any later time are derived without replaying history.

pub mod config;
pub mod error;
pub mod vector;

pub use config::{DecayConfig, MassDecay};
pub use error::{ConfigError, DecayError, Result};
pub use vector::{DecayedVector, VectorState};
