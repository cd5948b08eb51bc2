//! TEE binding service configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attestation::TeePlatform;
use crate::error::TeeError;

/// Selector for which TEE platforms are acceptable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformSelector {
    /// Accept any supported platform.
    Any,
    /// Accept only platforms from this allow-list.
    AllowList(Vec<TeePlatform>),
}

impl Default for PlatformSelector {
    fn default() -> Self {
        Self::Any
    }
}

impl PlatformSelector {
    /// Check whether a platform is accepted by this selector.
    pub fn accepts(&self, platform: TeePlatform) -> bool {
        match self {
            Self::Any => true,
            Self::AllowList(platforms) => platforms.contains(&platform),
        }
    }
}

/// Configuration for the TEE binding service.
///
/// Use [`TeeConfig::builder()`] to construct a validated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeeConfig {
    /// Which platforms are acceptable.
    #[serde(default)]
    pub platform_selector: PlatformSelector,
    /// Maximum age of an attestation before it is considered stale.
    #[serde(default = "default_max_attestation_age_secs")]
    pub max_attestation_age_secs: u64,
    /// Trust tiers for which a TEE binding is mandatory.
    #[serde(default = "default_required_for_tiers")]
    pub required_for_tiers: Vec<u8>,
    /// Whether to perform production (remote/cryptographic) verification
    /// of platform evidence. When `false`, all platforms are accepted on
    /// structural and freshness checks alone.
    #[serde(default)]
    pub production_mode: bool,
    /// Downgrade a failed production verification to a structural accept
    /// with `production_verified = false` instead of rejecting.
    #[serde(default)]
    pub allow_simulated_fallback: bool,
    /// Expected measurement per enclave id, lowercase hex. Enclaves
    /// without an entry skip the equality check.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expected_measurements: BTreeMap<String, String>,
    /// Expected Nitro PCR0 per enclave id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expected_nitro_pcr0: BTreeMap<String, String>,
    /// PCCS endpoint for SGX TCB collateral exchange in production mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pccs_url: Option<String>,
    /// Deadline for production verification network calls.
    #[serde(default = "default_verification_timeout_secs")]
    pub verification_timeout_secs: u64,
}

fn default_max_attestation_age_secs() -> u64 {
    3600
}

fn default_required_for_tiers() -> Vec<u8> {
    vec![4, 5]
}

fn default_verification_timeout_secs() -> u64 {
    30
}

impl Default for TeeConfig {
    fn default() -> Self {
        Self {
            platform_selector: PlatformSelector::default(),
            max_attestation_age_secs: default_max_attestation_age_secs(),
            required_for_tiers: default_required_for_tiers(),
            production_mode: false,
            allow_simulated_fallback: false,
            expected_measurements: BTreeMap::new(),
            expected_nitro_pcr0: BTreeMap::new(),
            pccs_url: None,
            verification_timeout_secs: default_verification_timeout_secs(),
        }
    }
}

impl TeeConfig {
    /// Create a new builder for `TeeConfig`.
    pub fn builder() -> TeeConfigBuilder {
        TeeConfigBuilder::default()
    }
}

/// Builder for [`TeeConfig`].
#[derive(Debug, Default)]
pub struct TeeConfigBuilder {
    config: TeeConfig,
}

impl TeeConfigBuilder {
    /// Set an allow-list of accepted platforms.
    pub fn allow_platforms(mut self, platforms: impl IntoIterator<Item = TeePlatform>) -> Self {
        self.config.platform_selector =
            PlatformSelector::AllowList(platforms.into_iter().collect());
        self
    }

    /// Set the maximum attestation age in seconds.
    pub fn max_attestation_age_secs(mut self, secs: u64) -> Self {
        self.config.max_attestation_age_secs = secs;
        self
    }

    /// Set the tiers for which a TEE binding is mandatory.
    pub fn required_for_tiers(mut self, tiers: impl IntoIterator<Item = u8>) -> Self {
        self.config.required_for_tiers = tiers.into_iter().collect();
        self
    }

    /// Enable or disable production verification.
    pub fn production_mode(mut self, enabled: bool) -> Self {
        self.config.production_mode = enabled;
        self
    }

    /// Allow downgrading failed production verification to a structural
    /// accept marked `production_verified = false`.
    pub fn allow_simulated_fallback(mut self, allow: bool) -> Self {
        self.config.allow_simulated_fallback = allow;
        self
    }

    /// Pin the expected measurement for an enclave id.
    pub fn expect_measurement(
        mut self,
        enclave_id: impl Into<String>,
        measurement: impl Into<String>,
    ) -> Self {
        self.config
            .expected_measurements
            .insert(enclave_id.into(), measurement.into().to_ascii_lowercase());
        self
    }

    /// Pin the expected Nitro PCR0 for an enclave id.
    pub fn expect_nitro_pcr0(
        mut self,
        enclave_id: impl Into<String>,
        pcr0: impl Into<String>,
    ) -> Self {
        self.config
            .expected_nitro_pcr0
            .insert(enclave_id.into(), pcr0.into().to_ascii_lowercase());
        self
    }

    /// Set the PCCS endpoint for SGX collateral exchange.
    pub fn pccs_url(mut self, url: impl Into<String>) -> Self {
        self.config.pccs_url = Some(url.into());
        self
    }

    /// Set the production verification deadline in seconds.
    pub fn verification_timeout_secs(mut self, secs: u64) -> Self {
        self.config.verification_timeout_secs = secs;
        self
    }

    /// Build the [`TeeConfig`], validating all fields.
    pub fn build(self) -> Result<TeeConfig, TeeError> {
        let config = self.config;

        if config.max_attestation_age_secs == 0 {
            return Err(TeeError::Config(
                "max_attestation_age_secs must be > 0".into(),
            ));
        }
        if let PlatformSelector::AllowList(platforms) = &config.platform_selector {
            if platforms.is_empty() {
                return Err(TeeError::Config("platform allow-list is empty".into()));
            }
        }
        if config.production_mode
            && config.pccs_url.is_none()
            && config.platform_selector.accepts(TeePlatform::Sgx)
        {
            return Err(TeeError::Config(
                "production SGX verification requires a pccs_url".into(),
            ));
        }
        if config.required_for_tiers.iter().any(|t| *t > 5) {
            return Err(TeeError::Config(
                "required_for_tiers entries must be in 0-5".into(),
            ));
        }

        Ok(config)
    }
}
