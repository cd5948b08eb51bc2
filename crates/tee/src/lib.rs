//! TEE attestation binding for agent identities.
//!
//! Verifies hardware attestations across heterogeneous platforms (SGX,
//! Nitro, SEV-SNP, TrustZone, Secure Enclave) and binds agent
//! verification keys to attested enclaves. Verification runs common
//! pre-checks (platform allow-listing, freshness, declared validity)
//! and then dispatches to a per-platform verifier.

pub mod attestation;
pub mod binding;
pub mod config;
pub mod error;
pub mod platforms;
pub mod service;
pub mod verifier;

pub use attestation::{Attestation, TeePlatform, VerifiedAttestation};
pub use binding::TeeKeyBinding;
pub use config::{PlatformSelector, TeeConfig, TeeConfigBuilder};
pub use error::TeeError;
pub use service::TeeBindingService;
pub use verifier::{PlatformOutcome, PlatformVerifier, VerifyContext};
