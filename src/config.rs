//! Engine configuration.
//!
//! All fields have defaults, so `{}` is a valid JSON configuration.
//! Unknown fields are rejected to catch typos.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::procedures::DEFAULT_SIGNIFICANCE_LEVEL;

/// Variance model for the two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceAssumption {
    /// Student's test with a pooled variance estimate.
    #[default]
    Pooled,
    /// Welch's test with Satterthwaite degrees of freedom.
    Welch,
}

/// Why a configuration was refused.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config `{field}` = {value}: {reason}")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by every procedure the engine builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// `alpha` for every significance decision, in `(0, 1)`.
    pub significance_level: f64,
    /// Permutations drawn by the resampling test.
    pub permutation_iterations: usize,
    /// Posterior draws per group for the probabilistic comparison.
    pub posterior_samples: usize,
    pub variance: VarianceAssumption,
    /// Fixed RNG seed; `None` draws a fresh seed per run.
    pub seed: Option<u64>,
    /// Upper bound on a column-advisor call.
    pub advisor_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            permutation_iterations: 10_000,
            posterior_samples: 10_000,
            variance: VarianceAssumption::Pooled,
            seed: None,
            advisor_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Examples
    /// ```
    /// use u_abtest::config::{EngineConfig, VarianceAssumption};
    ///
    /// let cfg = EngineConfig::from_json_str(r#"{"variance": "welch", "seed": 3}"#).unwrap();
    /// assert_eq!(cfg.variance, VarianceAssumption::Welch);
    /// assert_eq!(cfg.permutation_iterations, 10_000);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn advisor_timeout(&self) -> Duration {
        Duration::from_millis(self.advisor_timeout_ms)
    }

    /// Validate user-provided configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.significance_level;
        if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
            return Err(ConfigError::InvalidConfig {
                field: "significance_level".to_owned(),
                value: alpha.to_string(),
                reason: "must be strictly between 0 and 1".to_owned(),
            });
        }
        if self.permutation_iterations == 0 {
            return Err(ConfigError::InvalidConfig {
                field: "permutation_iterations".to_owned(),
                value: "0".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.posterior_samples == 0 {
            return Err(ConfigError::InvalidConfig {
                field: "posterior_samples".to_owned(),
                value: "0".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.advisor_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig {
                field: "advisor_timeout_ms".to_owned(),
                value: "0".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }
}
