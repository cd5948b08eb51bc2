//! Structural verifier for TrustZone and Secure Enclave.
//!
//! Neither platform offers a remote attestation service to consult:
//! TrustZone trusted applications and Apple's Secure Enclave both hand
//! the relying party a locally produced statement. The two share the
//! same verification shape, so one verifier handles both with platform
//! dispatch rather than duplicating logic across modules.

use async_trait::async_trait;

use crate::attestation::{Attestation, TeePlatform};
use crate::error::TeeError;
use crate::verifier::{PlatformOutcome, PlatformVerifier, VerifyContext};

/// Unified verifier for platforms without a remote attestation service.
///
/// Accepts the attestation once structural and freshness checks pass,
/// optionally enforcing a pinned measurement. Results from this verifier
/// are never marked `production_verified`.
#[derive(Debug, Clone, Copy)]
pub struct StructuralVerifier {
    platform: TeePlatform,
}

impl StructuralVerifier {
    /// Create a TrustZone verifier.
    pub fn trustzone() -> Self {
        Self {
            platform: TeePlatform::TrustZone,
        }
    }

    /// Create a Secure Enclave verifier.
    pub fn secure_enclave() -> Self {
        Self {
            platform: TeePlatform::SecureEnclave,
        }
    }
}

#[async_trait]
impl PlatformVerifier for StructuralVerifier {
    fn platform(&self) -> TeePlatform {
        self.platform
    }

    async fn verify(
        &self,
        attestation: &Attestation,
        ctx: &VerifyContext<'_>,
    ) -> Result<PlatformOutcome, TeeError> {
        if attestation.measurement_hash.is_empty()
            || hex::decode(&attestation.measurement_hash).is_err()
        {
            return Err(TeeError::AttestationVerification(format!(
                "{} measurement is not valid hex",
                self.platform
            )));
        }

        if let Some(expected) = ctx.expected_measurement(&attestation.enclave_id) {
            self.validate_measurement(expected, attestation)?;
        }

        tracing::debug!(
            platform = %self.platform,
            "structural attestation accepted; platform has no remote attestation service"
        );
        Ok(PlatformOutcome::structural())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn attestation(platform: TeePlatform, measurement: &str) -> Attestation {
        Attestation {
            platform,
            measurement_hash: measurement.to_string(),
            enclave_id: "app-1".to_string(),
            timestamp: 1_700_000_000,
            pcrs: BTreeMap::new(),
            signature: None,
            certificate_chain: Vec::new(),
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn test_accepts_valid_hex_measurement() {
        let verifier = StructuralVerifier::trustzone();
        let config = crate::TeeConfig::default();
        let http = reqwest::Client::new();
        let ctx = VerifyContext {
            config: &config,
            http: &http,
        };

        let outcome = verifier
            .verify(&attestation(TeePlatform::TrustZone, &"ab".repeat(32)), &ctx)
            .await
            .unwrap();
        assert!(!outcome.production_verified);
    }

    #[tokio::test]
    async fn test_rejects_non_hex_measurement() {
        let verifier = StructuralVerifier::secure_enclave();
        let config = crate::TeeConfig::default();
        let http = reqwest::Client::new();
        let ctx = VerifyContext {
            config: &config,
            http: &http,
        };

        let err = verifier
            .verify(&attestation(TeePlatform::SecureEnclave, "not-hex!"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, TeeError::AttestationVerification(_)));
    }
}
