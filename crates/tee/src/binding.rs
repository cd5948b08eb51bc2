//! Key-to-enclave bindings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::attestation::VerifiedAttestation;

/// A binding between an agent's verification-method key and an attested
/// enclave.
///
/// Created only after successful attestation verification; valid until
/// the earlier of the attestation's declared validity and the freshness
/// window at binding time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeeKeyBinding {
    /// Unique binding identifier.
    pub binding_id: String,
    /// The agent's DID verification-method key id.
    pub did_key_id: String,
    /// The enclave key the DID key is bound to.
    pub enclave_key_id: String,
    /// The enclave measurement at binding time, lowercase hex.
    pub measurement_hash: String,
    /// Deterministic commitment over the binding inputs.
    pub binding_proof: String,
    /// Unix seconds when the binding was created.
    pub bound_at: u64,
    /// Unix seconds when the binding expires.
    pub valid_until: u64,
}

impl TeeKeyBinding {
    /// Compute the commitment for a binding's inputs.
    ///
    /// `sha256(did_key_id : enclave_id : measurement_hash : bound_at)`,
    /// lowercase hex. Deterministic so the proof can be recomputed from
    /// the stored fields during verification.
    pub fn commitment(
        did_key_id: &str,
        enclave_id: &str,
        measurement_hash: &str,
        bound_at: u64,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(did_key_id.as_bytes());
        hasher.update(b":");
        hasher.update(enclave_id.as_bytes());
        hasher.update(b":");
        hasher.update(measurement_hash.as_bytes());
        hasher.update(b":");
        hasher.update(bound_at.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Construct a binding from a verified attestation.
    pub fn from_attestation(
        binding_id: String,
        did_key_id: String,
        attestation: &VerifiedAttestation,
        bound_at: u64,
        max_age_secs: u64,
    ) -> Self {
        let window_end = bound_at + max_age_secs;
        let valid_until = attestation
            .valid_until
            .map_or(window_end, |v| v.min(window_end));
        let binding_proof = Self::commitment(
            &did_key_id,
            &attestation.enclave_id,
            &attestation.measurement_hash,
            bound_at,
        );
        Self {
            binding_id,
            did_key_id,
            enclave_key_id: attestation.enclave_id.clone(),
            measurement_hash: attestation.measurement_hash.clone(),
            binding_proof,
            bound_at,
            valid_until,
        }
    }

    /// Whether the binding has expired at `now`.
    pub fn is_expired(&self, now_unix_secs: u64) -> bool {
        now_unix_secs >= self.valid_until
    }

    /// Whether the binding's proof matches the commitment recomputed
    /// from its own fields.
    pub fn proof_is_consistent(&self) -> bool {
        self.binding_proof
            == Self::commitment(
                &self.did_key_id,
                &self.enclave_key_id,
                &self.measurement_hash,
                self.bound_at,
            )
    }
}
