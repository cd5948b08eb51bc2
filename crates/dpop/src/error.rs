//! Error types for DPoP proof handling.

/// Errors that can occur while generating or verifying DPoP proofs.
#[derive(Debug, thiserror::Error)]
pub enum DpopError {
    /// The proof is structurally invalid (bad compact form, wrong `typ`,
    /// disallowed `alg`, missing `jwk`, malformed claims, bad `ath`,
    /// future-dated `iat`, or a private key component in the header).
    #[error("malformed dpop proof: {0}")]
    InvalidFormat(String),

    /// ECDSA signature verification failed.
    #[error("dpop proof signature verification failed")]
    InvalidSignature,

    /// The proof is older than the replay window allows.
    #[error("dpop proof expired: iat={iat}, max_proof_age_secs={max_proof_age_secs}")]
    Expired { iat: u64, max_proof_age_secs: u64 },

    /// The proof's `jti` was already accepted within the replay window.
    #[error("dpop proof replayed: jti={0}")]
    Replay(String),

    /// `htm` does not match the request method.
    #[error("dpop htm mismatch: expected {expected}, got {actual}")]
    MethodMismatch { expected: String, actual: String },

    /// `htu` does not match the request URI.
    #[error("dpop htu mismatch: expected {expected}, got {actual}")]
    UriMismatch { expected: String, actual: String },

    /// Service configuration is inconsistent.
    #[error("dpop config error: {0}")]
    Config(String),
}

impl DpopError {
    /// The stable error code surfaced to admission decisions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) | Self::Config(_) => "INVALID_FORMAT",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired { .. } => "EXPIRED",
            Self::Replay(_) => "REPLAY",
            Self::MethodMismatch { .. } => "METHOD_MISMATCH",
            Self::UriMismatch { .. } => "URI_MISMATCH",
        }
    }
}
