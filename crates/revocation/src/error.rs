//! Error types for the revocation engine.

/// Errors that can occur during revocation operations.
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    /// The delegation registry failed or timed out.
    #[error("delegation registry error: {0}")]
    DelegationRegistry(String),

    /// The token service failed or timed out.
    #[error("token service error: {0}")]
    TokenService(String),

    /// Webhook delivery failed.
    #[error("webhook delivery error: {0}")]
    Webhook(String),

    /// Service configuration is inconsistent.
    #[error("revocation config error: {0}")]
    Config(String),
}

impl RevocationError {
    /// The stable error code surfaced to admission decisions.
    pub fn code(&self) -> &'static str {
        "REVOCATION_ERROR"
    }
}
