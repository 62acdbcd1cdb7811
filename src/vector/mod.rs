//! Vector Module
//!
//! Time-decayed running-average embeddings and the kernels behind them.

mod decayed;
pub mod math;
mod state;

pub use decayed::DecayedVector;
pub use math::magnitude;
pub use state::VectorState;
