//! Decayed Running Average Vector
//!
//! A single embedding that absorbs a stream of timestamped events. Each
//! event's influence halves every `half_life_days`; the stored vector is a
//! weighted average, so its magnitude stays in the range of the inputs.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::math::{scale_in_place, scaled, weighted_average_in_place};
use super::state::VectorState;
use crate::config::{DecayConfig, MassDecay};
use crate::error::{first_non_finite, DecayError, Result};

/// Running decay-weighted average of event embeddings
#[derive(Debug, Clone, PartialEq)]
pub struct DecayedVector {
    embedding: Vec<f32>,
    weight_sum: f64,
    updated_at: DateTime<Utc>,
    /// Decay time constant in seconds
    tau: f64,
    config: DecayConfig,
}

impl DecayedVector {
    /// Build from prior state with the default skip window and mass rule.
    ///
    /// A new entity passes a zero vector, `weight_sum = 0` and the current
    /// time.
    pub fn new(
        embedding: Vec<f32>,
        half_life_days: f64,
        weight_sum: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        let config = DecayConfig::default().with_half_life_days(half_life_days);
        Self::with_config(embedding, weight_sum, updated_at, config)
    }

    /// Build from prior state with an explicit configuration.
    pub fn with_config(
        embedding: Vec<f32>,
        weight_sum: f64,
        updated_at: DateTime<Utc>,
        config: DecayConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedding.is_empty() {
            return Err(DecayError::EmptyEmbedding);
        }
        if !(weight_sum.is_finite() && weight_sum >= 0.0) {
            return Err(DecayError::InvalidWeightSum(weight_sum));
        }
        if let Some(index) = first_non_finite(&embedding) {
            return Err(DecayError::NonFiniteComponent { index });
        }

        Ok(Self {
            embedding,
            weight_sum,
            updated_at,
            tau: config.tau_secs(),
            config,
        })
    }

    /// Zero state for an entity with no history.
    pub fn zeroed(dimension: usize, config: DecayConfig, now: DateTime<Utc>) -> Result<Self> {
        Self::from_state(VectorState::empty(dimension, now), config)
    }

    /// Restore from a persisted [`VectorState`].
    pub fn from_state(state: VectorState, config: DecayConfig) -> Result<Self> {
        Self::with_config(state.embedding, state.weight_sum, state.updated_at, config)
    }

    /// Fold one event into the running average at time `now`.
    ///
    /// Inputs are validated before anything is mutated; on error the vector
    /// is unchanged.
    pub fn absorb(&mut self, event: &[f32], base_weight: f64, now: DateTime<Utc>) -> Result<()> {
        if event.len() != self.embedding.len() {
            return Err(DecayError::DimensionMismatch {
                expected: self.embedding.len(),
                actual: event.len(),
            });
        }
        if !(base_weight.is_finite() && base_weight > 0.0) {
            return Err(DecayError::InvalidBaseWeight(base_weight));
        }
        if let Some(index) = first_non_finite(event) {
            return Err(DecayError::NonFiniteComponent { index });
        }

        let dt = elapsed_secs(self.updated_at, now);
        let mut event_weight = base_weight;
        if dt < 0.0 {
            // Late event: age it to `updated_at` instead of decaying history.
            event_weight = base_weight * (dt / self.tau).exp();
            debug!(
                lag_secs = -dt,
                updated_at = %self.updated_at,
                event_weight,
                "Absorbing out-of-order event"
            );
        } else if dt > self.config.decay_skip_secs {
            let decay = (-dt / self.tau).exp();
            match self.config.mass_decay {
                MassDecay::Multiplicative => {
                    self.weight_sum *= decay;
                }
                MassDecay::Additive => {
                    scale_in_place(&mut self.embedding, decay);
                    self.weight_sum += decay;
                }
            }
            debug!(dt_secs = dt, decay, weight_sum = self.weight_sum, "Applied decay");
        }

        weighted_average_in_place(&mut self.embedding, self.weight_sum, event, event_weight);
        self.weight_sum += event_weight;
        if now > self.updated_at {
            self.updated_at = now;
        }

        Ok(())
    }

    /// Decayed copy of the embedding as seen at `at`.
    ///
    /// Queries at or before `updated_at` get an undecayed copy; there is no
    /// extrapolation backwards.
    pub fn snapshot_at(&self, at: DateTime<Utc>) -> Vec<f32> {
        let decay = self.decay_factor(at);
        if decay == 1.0 {
            return self.embedding.clone();
        }
        scaled(&self.embedding, decay)
    }

    /// Multiplier applied by [`snapshot_at`](Self::snapshot_at) for time `at`.
    pub fn decay_factor(&self, at: DateTime<Utc>) -> f64 {
        let dt = elapsed_secs(self.updated_at, at);
        if dt <= 0.0 {
            1.0
        } else {
            (-dt / self.tau).exp()
        }
    }

    /// Effective mass remaining at `at`.
    pub fn weight_at(&self, at: DateTime<Utc>) -> f64 {
        self.weight_sum * self.decay_factor(at)
    }

    /// Current running average, undecayed
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Effective mass as of `updated_at`
    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }

    /// Time of the last mutation
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Decay time constant in seconds
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Get half-life in days
    pub fn half_life_days(&self) -> f64 {
        self.config.half_life_days
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// Get decay configuration
    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// Copy of the persistable state.
    pub fn state(&self) -> VectorState {
        VectorState {
            embedding: self.embedding.clone(),
            weight_sum: self.weight_sum,
            updated_at: self.updated_at,
        }
    }

    /// Consume into the persistable state.
    pub fn into_state(self) -> VectorState {
        VectorState {
            embedding: self.embedding,
            weight_sum: self.weight_sum,
            updated_at: self.updated_at,
        }
    }
}

/// Signed seconds from `from` to `to`, millisecond resolution.
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < tol, "component {}: {} != {}", i, a, e);
        }
    }

    #[test]
    fn test_tau_derived_from_half_life() {
        let v = DecayedVector::new(vec![0.0; 3], 7.0, 0.0, t0()).unwrap();
        let expected = 7.0 * 86_400.0 / std::f64::consts::LN_2;
        assert!((v.tau() - expected).abs() < 1e-6);
        assert_eq!(v.half_life_days(), 7.0);
        assert_eq!(v.dimension(), 3);
    }

    #[test]
    fn test_construct_rejects_invalid_input() {
        assert_eq!(
            DecayedVector::new(vec![0.0; 3], 0.0, 0.0, t0()),
            Err(DecayError::InvalidHalfLife(0.0))
        );
        assert_eq!(
            DecayedVector::new(vec![0.0; 3], 7.0, -1.0, t0()),
            Err(DecayError::InvalidWeightSum(-1.0))
        );
        assert_eq!(
            DecayedVector::new(vec![], 7.0, 0.0, t0()),
            Err(DecayError::EmptyEmbedding)
        );
        assert_eq!(
            DecayedVector::new(vec![0.0, f32::NAN], 7.0, 0.0, t0()),
            Err(DecayError::NonFiniteComponent { index: 1 })
        );
    }

    #[test]
    fn test_first_absorb_copies_event() {
        let mut v = DecayedVector::zeroed(3, DecayConfig::default(), t0()).unwrap();
        v.absorb(&[0.25, -1.5, 3.0], 2.5, t0()).unwrap();

        assert_eq!(v.embedding(), &[0.25, -1.5, 3.0]);
        assert_eq!(v.weight_sum(), 2.5);
    }

    #[test]
    fn test_two_events_half_a_half_life_apart() {
        let mut v = DecayedVector::new(vec![0.0; 3], 7.0, 0.0, t0()).unwrap();

        v.absorb(&[1.0, 0.0, 0.0], 1.0, t0()).unwrap();
        assert_eq!(v.embedding(), &[1.0, 0.0, 0.0]);
        assert_eq!(v.weight_sum(), 1.0);

        let t1 = t0() + Duration::hours(84);
        v.absorb(&[0.0, 1.0, 0.0], 1.0, t1).unwrap();

        let d = (-std::f64::consts::LN_2 / 2.0).exp();
        let expected = [(d / (1.0 + d)) as f32, (1.0 / (1.0 + d)) as f32, 0.0];
        assert_close(v.embedding(), &expected, 1e-6);
        assert_close(v.embedding(), &[0.414, 0.586, 0.0], 1e-3);
        assert!((v.weight_sum() - (1.0 + d)).abs() < 1e-9);
        assert_eq!(v.updated_at(), t1);
    }

    #[test]
    fn test_additive_rule_matches_legacy_formula() {
        let config = DecayConfig::default().with_mass_decay(MassDecay::Additive);
        let mut v = DecayedVector::zeroed(3, config, t0()).unwrap();

        v.absorb(&[1.0, 0.0, 0.0], 1.0, t0()).unwrap();
        v.absorb(&[0.0, 1.0, 0.0], 1.0, t0() + Duration::hours(84)).unwrap();

        let d = (-std::f64::consts::LN_2 / 2.0).exp();
        let w = 1.0 + d;
        let expected = [(d * w / (w + 1.0)) as f32, (1.0 / (w + 1.0)) as f32, 0.0];
        assert_close(v.embedding(), &expected, 1e-6);
        assert!((v.weight_sum() - (2.0 + d)).abs() < 1e-9);
    }

    #[test]
    fn test_decay_skipped_within_window() {
        let mut v = DecayedVector::new(vec![1.0, 0.0], 7.0, 1.0, t0()).unwrap();
        v.absorb(&[0.0, 1.0], 1.0, t0() + Duration::milliseconds(900)).unwrap();

        assert_eq!(v.weight_sum(), 2.0);
        assert_close(v.embedding(), &[0.5, 0.5], 1e-6);
    }

    #[test]
    fn test_decay_skipped_at_exactly_one_second() {
        let mut v = DecayedVector::new(vec![1.0, 0.0], 7.0, 1.0, t0()).unwrap();
        v.absorb(&[0.0, 1.0], 1.0, t0() + Duration::seconds(1)).unwrap();

        assert_eq!(v.weight_sum(), 2.0);
        assert_close(v.embedding(), &[0.5, 0.5], 1e-6);
    }

    #[test]
    fn test_decay_applied_just_past_window() {
        let mut v = DecayedVector::new(vec![1.0, 0.0], 7.0, 1.0, t0()).unwrap();
        v.absorb(&[0.0, 1.0], 1.0, t0() + Duration::milliseconds(1001)).unwrap();

        let decay = (-1.001 / v.tau()).exp();
        assert!(v.weight_sum() < 2.0);
        assert!((v.weight_sum() - (1.0 + decay)).abs() < 1e-12);
    }

    #[test]
    fn test_rejected_absorb_leaves_state_untouched() {
        let mut v = DecayedVector::new(vec![0.5, 0.5], 7.0, 3.0, t0()).unwrap();
        let before = v.clone();
        let later = t0() + Duration::days(2);

        assert_eq!(
            v.absorb(&[1.0, 0.0, 0.0], 1.0, later),
            Err(DecayError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(
            v.absorb(&[1.0, 0.0], 0.0, later),
            Err(DecayError::InvalidBaseWeight(0.0))
        );
        assert!(matches!(
            v.absorb(&[1.0, 0.0], f64::NAN, later),
            Err(DecayError::InvalidBaseWeight(_))
        ));
        assert_eq!(
            v.absorb(&[f32::INFINITY, 0.0], 1.0, later),
            Err(DecayError::NonFiniteComponent { index: 0 })
        );

        assert_eq!(v, before);
    }

    #[test]
    fn test_out_of_order_event_aged_to_last_update() {
        let mut v = DecayedVector::new(vec![1.0, 0.0], 7.0, 1.0, t0()).unwrap();
        v.absorb(&[0.0, 1.0], 1.0, t0() - Duration::days(7)).unwrap();

        assert_eq!(v.updated_at(), t0());
        assert!((v.weight_sum() - 1.5).abs() < 1e-9);
        assert_close(v.embedding(), &[2.0 / 3.0, 1.0 / 3.0], 1e-6);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let early = t0() - Duration::days(7);

        let mut in_order = DecayedVector::zeroed(2, DecayConfig::default(), early).unwrap();
        in_order.absorb(&[0.0, 1.0], 1.0, early).unwrap();
        in_order.absorb(&[1.0, 0.0], 1.0, t0()).unwrap();

        let mut reversed = DecayedVector::zeroed(2, DecayConfig::default(), early).unwrap();
        reversed.absorb(&[1.0, 0.0], 1.0, t0()).unwrap();
        reversed.absorb(&[0.0, 1.0], 1.0, early).unwrap();

        assert_close(reversed.embedding(), in_order.embedding(), 1e-6);
        assert_close(in_order.embedding(), &[2.0 / 3.0, 1.0 / 3.0], 1e-6);
        assert!((reversed.weight_sum() - in_order.weight_sum()).abs() < 1e-9);
        assert_eq!(reversed.updated_at(), in_order.updated_at());
    }

    #[test]
    fn test_snapshot_identity_and_early_query() {
        let v = DecayedVector::new(vec![0.3, -0.6, 0.9], 7.0, 4.0, t0()).unwrap();

        assert_eq!(v.snapshot_at(t0()), v.embedding());
        assert_eq!(v.snapshot_at(t0() - Duration::days(30)), v.embedding());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let v = DecayedVector::new(vec![1.0, 2.0], 7.0, 1.0, t0()).unwrap();

        let mut early = v.snapshot_at(t0() - Duration::hours(1));
        early[0] = 100.0;
        let mut late = v.snapshot_at(t0() + Duration::days(1));
        late[1] = 100.0;

        assert_eq!(v.embedding(), &[1.0, 2.0]);
    }

    #[test]
    fn test_snapshot_half_life() {
        let v = DecayedVector::new(vec![0.8, -0.4, 0.2], 7.0, 1.0, t0()).unwrap();
        let snap = v.snapshot_at(t0() + Duration::days(7));

        assert_close(&snap, &[0.4, -0.2, 0.1], 1e-6);
        assert!((v.decay_factor(t0() + Duration::days(7)) - 0.5).abs() < 1e-12);
        assert!((v.weight_at(t0() + Duration::days(14)) - 0.25).abs() < 1e-12);
        assert_eq!(v.weight_at(t0()), 1.0);
    }

    #[test]
    fn test_state_round_trip() {
        let mut v = DecayedVector::zeroed(2, DecayConfig::default(), t0()).unwrap();
        v.absorb(&[0.2, 0.4], 1.5, t0() + Duration::hours(1)).unwrap();

        let state = v.state();
        assert_eq!(state.embedding, vec![0.2, 0.4]);
        assert_eq!(state.weight_sum, 1.5);
        assert_eq!(state.updated_at, t0() + Duration::hours(1));

        let restored = DecayedVector::from_state(state, DecayConfig::default()).unwrap();
        assert_eq!(restored, v);
        assert_eq!(v.into_state(), restored.state());
    }

    #[test]
    fn test_zeroed_rejects_zero_dimension() {
        assert_eq!(
            DecayedVector::zeroed(0, DecayConfig::default(), t0()),
            Err(DecayError::EmptyEmbedding)
        );
    }
}
