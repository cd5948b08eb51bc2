//! Platform-specific attestation verifiers.
//!
//! Each module implements [`PlatformVerifier`](crate::PlatformVerifier)
//! for one evidence format. TrustZone and Secure Enclave share the same
//! structural shape and are unified in the `structural` module with
//! platform dispatch.

pub mod nitro;
pub mod sev_snp;
pub mod sgx;
pub mod structural;

pub use nitro::NitroVerifier;
pub use sev_snp::SevSnpVerifier;
pub use sgx::SgxVerifier;
pub use structural::StructuralVerifier;
