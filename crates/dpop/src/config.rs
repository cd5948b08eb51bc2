//! DPoP service configuration.

use serde::{Deserialize, Serialize};

use crate::error::DpopError;
use crate::jose::DpopAlgorithm;

/// Configuration for [`DpopService`](crate::DpopService).
///
/// Use [`DpopConfig::builder()`] to construct a validated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpopConfig {
    /// Maximum acceptable proof age in seconds (`now - iat`). Also the
    /// replay-cache retention per JTI.
    #[serde(default = "default_max_proof_age_secs")]
    pub max_proof_age_secs: u64,
    /// Clock-skew tolerance in seconds, applied to all `iat` comparisons.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
    /// Trust tiers for which DPoP is mandatory.
    #[serde(default = "default_required_for_tiers")]
    pub required_for_tiers: Vec<u8>,
    /// Allowed proof algorithms.
    #[serde(default = "default_allowed_algorithms")]
    pub allowed_algorithms: Vec<DpopAlgorithm>,
    /// Period of the replay-cache sweep task, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_proof_age_secs() -> u64 {
    300
}

fn default_clock_skew_secs() -> u64 {
    5
}

fn default_required_for_tiers() -> Vec<u8> {
    vec![2, 3, 4, 5]
}

fn default_allowed_algorithms() -> Vec<DpopAlgorithm> {
    vec![
        DpopAlgorithm::Es256,
        DpopAlgorithm::Es384,
        DpopAlgorithm::Es512,
    ]
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for DpopConfig {
    fn default() -> Self {
        Self {
            max_proof_age_secs: default_max_proof_age_secs(),
            clock_skew_secs: default_clock_skew_secs(),
            required_for_tiers: default_required_for_tiers(),
            allowed_algorithms: default_allowed_algorithms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl DpopConfig {
    /// Create a new builder for `DpopConfig`.
    pub fn builder() -> DpopConfigBuilder {
        DpopConfigBuilder::default()
    }
}

/// Builder for [`DpopConfig`].
#[derive(Debug, Default)]
pub struct DpopConfigBuilder {
    max_proof_age_secs: Option<u64>,
    clock_skew_secs: Option<u64>,
    required_for_tiers: Option<Vec<u8>>,
    allowed_algorithms: Option<Vec<DpopAlgorithm>>,
    sweep_interval_secs: Option<u64>,
}

impl DpopConfigBuilder {
    /// Set the maximum proof age in seconds.
    pub fn max_proof_age_secs(mut self, secs: u64) -> Self {
        self.max_proof_age_secs = Some(secs);
        self
    }

    /// Set the clock-skew tolerance in seconds.
    pub fn clock_skew_secs(mut self, secs: u64) -> Self {
        self.clock_skew_secs = Some(secs);
        self
    }

    /// Set the tiers for which DPoP is mandatory.
    pub fn required_for_tiers(mut self, tiers: impl IntoIterator<Item = u8>) -> Self {
        self.required_for_tiers = Some(tiers.into_iter().collect());
        self
    }

    /// Set the allowed proof algorithms.
    pub fn allowed_algorithms(mut self, algs: impl IntoIterator<Item = DpopAlgorithm>) -> Self {
        self.allowed_algorithms = Some(algs.into_iter().collect());
        self
    }

    /// Set the replay-cache sweep period in seconds.
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = Some(secs);
        self
    }

    /// Build the [`DpopConfig`], validating all fields.
    pub fn build(self) -> Result<DpopConfig, DpopError> {
        let config = DpopConfig {
            max_proof_age_secs: self
                .max_proof_age_secs
                .unwrap_or_else(default_max_proof_age_secs),
            clock_skew_secs: self.clock_skew_secs.unwrap_or_else(default_clock_skew_secs),
            required_for_tiers: self
                .required_for_tiers
                .unwrap_or_else(default_required_for_tiers),
            allowed_algorithms: self
                .allowed_algorithms
                .unwrap_or_else(default_allowed_algorithms),
            sweep_interval_secs: self
                .sweep_interval_secs
                .unwrap_or_else(default_sweep_interval_secs),
        };

        if config.max_proof_age_secs == 0 {
            return Err(DpopError::Config("max_proof_age_secs must be > 0".into()));
        }
        if config.allowed_algorithms.is_empty() {
            return Err(DpopError::Config(
                "at least one allowed algorithm is required".into(),
            ));
        }
        if config.required_for_tiers.iter().any(|t| *t > 5) {
            return Err(DpopError::Config(
                "required_for_tiers entries must be in 0-5".into(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DpopConfig::default();
        assert_eq!(config.max_proof_age_secs, 300);
        assert_eq!(config.clock_skew_secs, 5);
        assert_eq!(config.required_for_tiers, vec![2, 3, 4, 5]);
        assert_eq!(config.allowed_algorithms.len(), 3);
    }

    #[test]
    fn test_builder_rejects_zero_proof_age() {
        let err = DpopConfig::builder().max_proof_age_secs(0).build();
        assert!(matches!(err, Err(DpopError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_empty_algorithms() {
        let err = DpopConfig::builder().allowed_algorithms([]).build();
        assert!(matches!(err, Err(DpopError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_out_of_range_tier() {
        let err = DpopConfig::builder().required_for_tiers([2, 9]).build();
        assert!(matches!(err, Err(DpopError::Config(_))));
    }
}
