//! Error types for the TEE binding subsystem.

use crate::attestation::TeePlatform;

/// Errors that can occur verifying attestations or key bindings.
#[derive(Debug, thiserror::Error)]
pub enum TeeError {
    /// TEE configuration error.
    #[error("tee config error: {0}")]
    Config(String),

    /// Attestation verification failed.
    #[error("attestation verification failed: {0}")]
    AttestationVerification(String),

    /// Attestation is older than the freshness window, or past its
    /// declared validity.
    #[error("attestation expired: timestamp={timestamp}, max_age_secs={max_age_secs}")]
    AttestationExpired { timestamp: u64, max_age_secs: u64 },

    /// The attesting platform is not in the allow-list.
    #[error("tee platform not allowed: {0}")]
    PlatformNotAllowed(TeePlatform),

    /// Measurement does not match the expected value for the enclave.
    #[error("measurement mismatch: expected {expected}, got {actual}")]
    MeasurementMismatch { expected: String, actual: String },

    /// Key-to-enclave binding missing, malformed, or expired.
    #[error("key binding error: {0}")]
    KeyBinding(String),
}

impl TeeError {
    /// The stable error code surfaced to admission decisions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::AttestationVerification(_) => "TEE_ATTESTATION_ERROR",
            Self::AttestationExpired { .. } => "TEE_EXPIRED",
            Self::PlatformNotAllowed(_) => "TEE_PLATFORM_NOT_ALLOWED",
            Self::MeasurementMismatch { .. } => "TEE_MEASUREMENT_MISMATCH",
            Self::KeyBinding(_) => "TEE_KEY_BINDING_ERROR",
        }
    }
}
