//! Error types for token lifetime and introspection.

/// Errors from token lifetime validation.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token claims could not be decoded.
    #[error("token claims malformed: {0}")]
    Malformed(String),

    /// The `exp` claim is missing.
    #[error("token is missing the exp claim")]
    MissingExp,

    /// The `iat` claim is missing.
    #[error("token is missing the iat claim")]
    MissingIat,

    /// The token is expired.
    #[error("token expired at {exp}, now {now}")]
    Expired { exp: u64, now: u64 },

    /// The token's total lifetime exceeds the allowed ceiling.
    #[error("token ttl too long: {total_secs}s issued, maximum {max_secs}s")]
    TtlTooLong { total_secs: u64, max_secs: u64 },

    /// Service configuration is inconsistent.
    #[error("token lifetime config error: {0}")]
    Config(String),
}

impl TokenError {
    /// The stable error code surfaced to admission decisions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "TOKEN_MALFORMED",
            Self::MissingExp => "MISSING_EXP",
            Self::MissingIat => "MISSING_IAT",
            Self::Expired { .. } => "TOKEN_EXPIRED",
            Self::TtlTooLong { .. } => "TOKEN_TTL_TOO_LONG",
            Self::Config(_) => "TOKEN_MALFORMED",
        }
    }
}

/// Errors from the introspection endpoint.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    /// The endpoint answered with an error status.
    #[error("introspection endpoint returned http {status}")]
    Endpoint { status: u16 },

    /// The endpoint did not answer within the deadline.
    #[error("introspection timed out after {deadline_secs}s")]
    Timeout { deadline_secs: u64 },

    /// Transport-level failure reaching the endpoint.
    #[error("introspection transport error: {0}")]
    Transport(String),

    /// The response body was not a valid RFC 7662 document.
    #[error("introspection response malformed: {0}")]
    Decode(String),

    /// Client configuration is inconsistent.
    #[error("introspection config error: {0}")]
    Config(String),
}

impl IntrospectionError {
    /// The stable error code surfaced to admission decisions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "INTROSPECTION_TIMEOUT",
            _ => "INTROSPECTION_ERROR",
        }
    }
}
