//! Tree configuration with builder pattern.
//!
//! [`TreeConfig`] groups the knobs of the split test and the value learning
//! rate. It uses the `bon` crate for builder generation, validates at build
//! time, and can be loaded from JSON.
//!
//! # Example
//!
//! ```
//! use adaptree::TreeConfig;
//!
//! // All defaults
//! let config = TreeConfig::builder().build().unwrap();
//!
//! // Split eagerly, remember only the last 50 values per leaf
//! let config = TreeConfig::builder()
//!     .q_learn_rate(50)
//!     .filter_val(0.5)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::stats::FilterParams;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The value learning rate cap must allow at least one sample.
    #[error("q_learn_rate must be at least 1")]
    InvalidLearnRate,
    /// A ratio outside of `(0, 1]`.
    #[error("{field} must be in (0, 1], got {value}")]
    InvalidRatio { field: &'static str, value: f64 },
    /// A value that must be non-negative (or positive) was not.
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
    /// `upper_t` must be strictly above `lower_t`.
    #[error("upper_t ({upper}) must be greater than lower_t ({lower})")]
    InvertedThresholds { lower: f64, upper: f64 },
    /// The JSON document could not be parsed.
    #[error("invalid config document: {0}")]
    Parse(String),
}

// =============================================================================
// TreeConfig
// =============================================================================

/// Configuration shared by every update of a [`RefinementForest`](crate::RefinementForest).
///
/// # Structure
///
/// - **Value learning**: `q_learn_rate`
/// - **Split test**: `indefference`, `lower_t`, `upper_t`, `ks_limit`
/// - **Evidence filter**: `filter_rate`, `filter_val`
/// - **Reproducibility**: `seed`
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[serde(default)]
pub struct TreeConfig {
    /// Cap on the effective sample count of a leaf's value estimate.
    /// Default: unbounded (plain running average).
    ///
    /// With a cap of `k` the estimate becomes an exponential average with
    /// step `1 / (k + 1)` once a leaf has seen more than `k` values.
    #[builder(default = u64::MAX)]
    pub q_learn_rate: u64,

    /// Indifference margin, multiplied by the caller's `delta`. Default: 0.0.
    ///
    /// Partition means closer than `delta * indefference` never produce
    /// split evidence.
    #[builder(default = 0.0)]
    pub indefference: f64,

    /// Statistic value where split evidence starts. Default: 1.0.
    #[builder(default = 1.0)]
    pub lower_t: f64,

    /// Statistic value where split evidence is complete. Default: 3.0.
    #[builder(default = 3.0)]
    pub upper_t: f64,

    /// Bound on the absolute divergence statistic. Default: 8.0.
    #[builder(default = 8.0)]
    pub ks_limit: f64,

    /// Decay rate of the split evidence, in `(0, 1]`. Default: 0.05.
    #[builder(default = 0.05)]
    pub filter_rate: f64,

    /// Evidence at which a leaf splits, in `(0, 1]`. Default: 0.9.
    #[builder(default = 0.9)]
    pub filter_val: f64,

    /// Seed of the split tie-break generator. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

/// Custom finishing function that validates the config.
impl<S: tree_config_builder::IsComplete> TreeConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `q_learn_rate == 0`
    /// - `filter_rate` or `filter_val` outside `(0, 1]`
    /// - negative `indefference`, non-positive `ks_limit`
    /// - `upper_t <= lower_t`
    pub fn build(self) -> Result<TreeConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl TreeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.q_learn_rate == 0 {
            return Err(ConfigError::InvalidLearnRate);
        }
        check_ratio("filter_rate", self.filter_rate)?;
        check_ratio("filter_val", self.filter_val)?;
        if !(self.indefference >= 0.0 && self.indefference.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "indefference",
                expected: "finite and non-negative",
                value: self.indefference,
            });
        }
        if !(self.ks_limit > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "ks_limit",
                expected: "positive",
                value: self.ks_limit,
            });
        }
        if !(self.upper_t > self.lower_t) {
            return Err(ConfigError::InvertedThresholds {
                lower: self.lower_t,
                upper: self.upper_t,
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TreeConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Split-filter thresholds for an update with step size `delta`.
    pub(crate) fn filter_params(&self, delta: f64) -> FilterParams {
        FilterParams {
            indifference: delta * self.indefference,
            lower_t: self.lower_t,
            upper_t: self.upper_t,
            limit: self.ks_limit,
            decay: self.filter_rate,
        }
    }
}

fn check_ratio(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRatio { field, value })
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================
