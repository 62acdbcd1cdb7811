//! Decay Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, DecayError, Result};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// How the decay phase of an absorb treats the accumulated mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassDecay {
    /// `weight_sum *= decay`; the stored average itself is left as is.
    #[default]
    Multiplicative,
    /// Legacy rule: `embedding *= decay` and `weight_sum += decay`.
    Additive,
}

/// Decay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Half-life of an event's influence, in days
    pub half_life_days: f64,

    /// Elapsed seconds at or below which an absorb skips the decay phase
    pub decay_skip_secs: f64,

    /// Mass accumulation rule
    pub mass_decay: MassDecay,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_days: 7.0,
            decay_skip_secs: 1.0,
            mass_decay: MassDecay::Multiplicative,
        }
    }
}

impl DecayConfig {
    /// Set the half-life in days
    pub fn with_half_life_days(mut self, days: f64) -> Self {
        self.half_life_days = days;
        self
    }

    /// Set the decay skip window in seconds
    pub fn with_decay_skip_secs(mut self, secs: f64) -> Self {
        self.decay_skip_secs = secs;
        self
    }

    /// Set the mass accumulation rule
    pub fn with_mass_decay(mut self, rule: MassDecay) -> Self {
        self.mass_decay = rule;
        self
    }

    /// Decay time constant in seconds: `half_life / ln 2`.
    pub fn tau_secs(&self) -> f64 {
        self.half_life_days * SECONDS_PER_DAY / std::f64::consts::LN_2
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            return Err(DecayError::InvalidHalfLife(self.half_life_days));
        }
        if !(self.decay_skip_secs.is_finite() && self.decay_skip_secs >= 0.0) {
            return Err(DecayError::InvalidSkipWindow(self.decay_skip_secs));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}
