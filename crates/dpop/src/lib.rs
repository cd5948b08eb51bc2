//! DPoP proof-of-possession for agent requests (RFC 9449).
//!
//! Every hardened request carries a compact JWS proving possession of a
//! private key bound to the request's HTTP method and URI, optionally
//! bound to the access token via its SHA-256 hash. Replay is prevented
//! by a JTI cache scoped to the proof lifetime.

pub mod config;
pub mod error;
pub mod jose;
pub mod proof;
pub mod replay;

pub use config::{DpopConfig, DpopConfigBuilder};
pub use error::DpopError;
pub use jose::{DpopAlgorithm, DpopKeyPair, EcJwk, access_token_hash};
pub use proof::{DpopService, ProofClaims, VerifiedProof};
pub use replay::{InMemoryJtiCache, JtiCache};
