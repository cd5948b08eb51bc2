//! Platform verifier trait and shared verification context.

use async_trait::async_trait;

use crate::attestation::{Attestation, TeePlatform};
use crate::config::TeeConfig;
use crate::error::TeeError;

/// Outcome of a platform-specific verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformOutcome {
    /// Whether production (remote/cryptographic) verification completed,
    /// as opposed to a structural accept.
    pub production_verified: bool,
}

impl PlatformOutcome {
    /// A structural accept without production verification.
    pub fn structural() -> Self {
        Self {
            production_verified: false,
        }
    }

    /// A fully production-verified accept.
    pub fn production() -> Self {
        Self {
            production_verified: true,
        }
    }
}

/// Context handed to platform verifiers.
///
/// Carries the service configuration and the HTTP client used for
/// production collateral exchange, so verifiers stay plain values.
pub struct VerifyContext<'a> {
    /// The service configuration.
    pub config: &'a TeeConfig,
    /// Client for production verification network calls.
    pub http: &'a reqwest::Client,
}

impl VerifyContext<'_> {
    /// Expected measurement for the attestation's enclave id, if pinned.
    pub fn expected_measurement(&self, enclave_id: &str) -> Option<&str> {
        self.config
            .expected_measurements
            .get(enclave_id)
            .map(String::as_str)
    }
}

/// Verifier for one TEE platform's evidence format.
///
/// Implementations validate the platform envelope and measurement
/// policy. Freshness, allow-listing, and `valid_until` checks run before
/// dispatch and are not a verifier concern.
#[async_trait]
pub trait PlatformVerifier: Send + Sync {
    /// The platform this verifier handles.
    fn platform(&self) -> TeePlatform;

    /// Verify platform-specific evidence.
    async fn verify(
        &self,
        attestation: &Attestation,
        ctx: &VerifyContext<'_>,
    ) -> Result<PlatformOutcome, TeeError>;

    /// Compare an expected measurement against the attestation.
    fn validate_measurement(
        &self,
        expected: &str,
        attestation: &Attestation,
    ) -> Result<(), TeeError> {
        let actual = attestation.measurement_hash.to_ascii_lowercase();
        if actual != expected.to_ascii_lowercase() {
            return Err(TeeError::MeasurementMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }
}

/// Downgrade a production failure to a structural accept when the
/// fallback knob allows it; otherwise surface the error.
pub(crate) fn production_failure(
    ctx: &VerifyContext<'_>,
    platform: TeePlatform,
    error: TeeError,
) -> Result<PlatformOutcome, TeeError> {
    if ctx.config.allow_simulated_fallback {
        tracing::warn!(
            platform = %platform,
            error = %error,
            "production attestation verification failed, accepting with simulated fallback"
        );
        return Ok(PlatformOutcome::structural());
    }
    Err(error)
}
