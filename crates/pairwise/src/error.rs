//! Error types for pairwise DID derivation.

/// Errors that can occur deriving or validating pairwise DIDs.
#[derive(Debug, thiserror::Error)]
pub enum PairwiseError {
    /// Derivation failed (bad inputs or KDF expansion failure).
    #[error("pairwise derivation failed: {0}")]
    Derivation(String),

    /// Service configuration is inconsistent.
    #[error("pairwise config error: {0}")]
    Config(String),
}

impl PairwiseError {
    /// The stable error code surfaced to admission decisions.
    pub fn code(&self) -> &'static str {
        "PAIRWISE_DID_ERROR"
    }
}
