//! Request admission for agent actions.
//!
//! The coordinator resolves a tier's security requirements and runs the
//! sub-checks in order: token lifetime, DPoP proof, introspection,
//! revocation, TEE binding, pairwise identifier. The first failing
//! phase denies the request with structured errors; required checks
//! that cannot complete (endpoint down, registry timeout) deny rather
//! than pass (fail-closed).

pub mod coordinator;
pub mod types;

pub use coordinator::{CoordinatorConfig, SecurityCoordinator};
pub use types::{ActionRequest, AdmissionDecision, AdmissionRequest, CheckError, Component};
