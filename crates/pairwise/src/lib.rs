//! Pairwise DID derivation for relationship privacy.
//!
//! A master DID is never shown to relying parties handling personal,
//! sensitive, or regulated data; instead a deterministic, salted
//! derivation produces one `did:key` per relationship, preventing
//! cross-service correlation.

pub mod config;
pub mod derivation;
pub mod error;
pub mod service;

pub use config::PairwiseConfig;
pub use derivation::{DerivationAlgorithm, derive_material, material_to_did_key};
pub use error::PairwiseError;
pub use service::{DerivationRecord, PairwiseDidService, PairwiseRequirement};
