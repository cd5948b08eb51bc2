//! Token lifetime discipline and live introspection.
//!
//! Lifetime checks bound how long an issued token may live under a
//! trust tier (high-value operations get a tighter ceiling) and
//! recommend refresh before expiry. Introspection consults the issuer's
//! RFC 7662 endpoint for live token status, with a digest-keyed TTL
//! cache in front.

pub mod claims;
pub mod error;
pub mod introspection;
pub mod lifetime;

pub use claims::{Confirmation, TokenClaims, decode_claims};
pub use error::{IntrospectionError, TokenError};
pub use introspection::{
    IntrospectionClient, IntrospectionConfig, IntrospectionOutcome, IntrospectionResult,
};
pub use lifetime::{LifetimeConfig, LifetimeReport, TokenLifetimeService, TokenType};
