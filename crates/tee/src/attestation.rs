//! Attestation data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Supported TEE platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeePlatform {
    /// Intel SGX enclaves.
    Sgx,
    /// AWS Nitro Enclaves.
    Nitro,
    /// AMD SEV-SNP confidential VMs.
    SevSnp,
    /// ARM TrustZone trusted applications.
    TrustZone,
    /// Apple Secure Enclave.
    SecureEnclave,
}

impl core::fmt::Display for TeePlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Sgx => write!(f, "sgx"),
            Self::Nitro => write!(f, "nitro"),
            Self::SevSnp => write!(f, "sev_snp"),
            Self::TrustZone => write!(f, "trustzone"),
            Self::SecureEnclave => write!(f, "secure_enclave"),
        }
    }
}

/// An attestation statement presented by an agent.
///
/// The `signature` field carries the platform-defined evidence envelope
/// (SGX quote, Nitro COSE_Sign1 document, SEV-SNP report) when one is
/// available; TrustZone and Secure Enclave attestations are structural.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    /// The attesting platform.
    pub platform: TeePlatform,
    /// Hex-encoded enclave measurement.
    pub measurement_hash: String,
    /// Identifier of the attested enclave image.
    pub enclave_id: String,
    /// Unix timestamp (seconds) when the attestation was produced.
    pub timestamp: u64,
    /// Platform configuration registers, where the platform has them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pcrs: BTreeMap<String, String>,
    /// Raw platform evidence envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
    /// Certificate chain accompanying the evidence, PEM entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_chain: Vec<String>,
    /// Declared end of validity (Unix seconds), if the platform sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<u64>,
}

impl Attestation {
    /// Whether the attestation is older than `max_age_secs` at `now`.
    pub fn is_stale(&self, now_unix_secs: u64, max_age_secs: u64) -> bool {
        now_unix_secs.saturating_sub(self.timestamp) > max_age_secs
    }
}

/// A successfully verified attestation.
///
/// Constructed only by the binding service after platform verification,
/// so holding one is proof the checks ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedAttestation {
    /// The verified platform.
    pub platform: TeePlatform,
    /// The verified measurement, lowercase hex.
    pub measurement_hash: String,
    /// The attested enclave image.
    pub enclave_id: String,
    /// Whether production (remote/cryptographic) verification completed.
    /// `false` means the simulated-fallback path accepted the evidence
    /// on structural and freshness checks alone.
    pub production_verified: bool,
    /// Unix seconds when verification completed.
    pub verified_at: u64,
    /// End of the attestation's validity, if declared.
    pub valid_until: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(platform: TeePlatform) -> Attestation {
        Attestation {
            platform,
            measurement_hash: "a".repeat(64),
            enclave_id: "enclave-1".to_string(),
            timestamp: 1_700_000_000,
            pcrs: BTreeMap::new(),
            signature: None,
            certificate_chain: Vec::new(),
            valid_until: None,
        }
    }

    #[test]
    fn test_staleness_window() {
        let attestation = sample(TeePlatform::Sgx);
        assert!(!attestation.is_stale(1_700_000_100, 3600));
        assert!(attestation.is_stale(1_700_004_000, 3600));
    }

    #[test]
    fn test_platform_serde_labels() {
        let json = serde_json::to_string(&TeePlatform::SevSnp).unwrap();
        assert_eq!(json, "\"sev_snp\"");
        assert_eq!(TeePlatform::SecureEnclave.to_string(), "secure_enclave");
    }
}
