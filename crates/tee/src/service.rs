//! The TEE binding service: pre-checks, platform dispatch, and the
//! binding registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use aci_core::{Clock, TrustTier};
use dashmap::DashMap;
use uuid::Uuid;

use crate::attestation::{Attestation, TeePlatform, VerifiedAttestation};
use crate::binding::TeeKeyBinding;
use crate::config::TeeConfig;
use crate::error::TeeError;
use crate::platforms::{NitroVerifier, SevSnpVerifier, SgxVerifier, StructuralVerifier};
use crate::verifier::{PlatformVerifier, VerifyContext};

/// Attestation verification and key-binding service.
///
/// Holds one verifier per supported platform and a registry of
/// key-to-enclave bindings created from verified attestations.
pub struct TeeBindingService {
    config: TeeConfig,
    verifiers: BTreeMap<TeePlatform, Box<dyn PlatformVerifier>>,
    bindings: Arc<DashMap<String, TeeKeyBinding>>,
    clock: Arc<dyn Clock>,
    http: reqwest::Client,
}

impl TeeBindingService {
    /// Create a service with the default verifier set for all supported
    /// platforms.
    pub fn new(config: TeeConfig, clock: Arc<dyn Clock>) -> Self {
        let mut verifiers: BTreeMap<TeePlatform, Box<dyn PlatformVerifier>> = BTreeMap::new();
        verifiers.insert(TeePlatform::Sgx, Box::new(SgxVerifier));
        verifiers.insert(TeePlatform::Nitro, Box::new(NitroVerifier));
        verifiers.insert(TeePlatform::SevSnp, Box::new(SevSnpVerifier));
        verifiers.insert(
            TeePlatform::TrustZone,
            Box::new(StructuralVerifier::trustzone()),
        );
        verifiers.insert(
            TeePlatform::SecureEnclave,
            Box::new(StructuralVerifier::secure_enclave()),
        );
        Self {
            config,
            verifiers,
            bindings: Arc::new(DashMap::new()),
            clock,
            http: reqwest::Client::new(),
        }
    }

    /// Replace the verifier for a platform (e.g. with a test double).
    pub fn set_verifier(&mut self, verifier: Box<dyn PlatformVerifier>) {
        self.verifiers.insert(verifier.platform(), verifier);
    }

    /// The service configuration.
    pub fn config(&self) -> &TeeConfig {
        &self.config
    }

    /// Whether a TEE binding is mandatory for the given trust tier.
    pub fn is_required(&self, tier: TrustTier) -> bool {
        self.config.required_for_tiers.contains(&tier.value())
    }

    /// Verify an attestation.
    ///
    /// Runs the common pre-checks (platform allow-listing, freshness,
    /// declared validity), then dispatches to the platform verifier.
    pub async fn verify_attestation(
        &self,
        attestation: &Attestation,
    ) -> Result<VerifiedAttestation, TeeError> {
        if !self.config.platform_selector.accepts(attestation.platform) {
            return Err(TeeError::PlatformNotAllowed(attestation.platform));
        }

        let now = self.clock.now_unix_secs();
        if attestation.is_stale(now, self.config.max_attestation_age_secs) {
            return Err(TeeError::AttestationExpired {
                timestamp: attestation.timestamp,
                max_age_secs: self.config.max_attestation_age_secs,
            });
        }
        if let Some(valid_until) = attestation.valid_until {
            if valid_until <= now {
                return Err(TeeError::AttestationExpired {
                    timestamp: attestation.timestamp,
                    max_age_secs: self.config.max_attestation_age_secs,
                });
            }
        }
        if attestation.enclave_id.is_empty() {
            return Err(TeeError::AttestationVerification(
                "attestation is missing an enclave id".into(),
            ));
        }

        let verifier = self.verifiers.get(&attestation.platform).ok_or_else(|| {
            TeeError::AttestationVerification(format!(
                "no verifier registered for platform {}",
                attestation.platform
            ))
        })?;

        let ctx = VerifyContext {
            config: &self.config,
            http: &self.http,
        };
        let outcome = verifier.verify(attestation, &ctx).await?;

        tracing::debug!(
            platform = %attestation.platform,
            enclave_id = %attestation.enclave_id,
            production_verified = outcome.production_verified,
            "attestation verified"
        );

        Ok(VerifiedAttestation {
            platform: attestation.platform,
            measurement_hash: attestation.measurement_hash.to_ascii_lowercase(),
            enclave_id: attestation.enclave_id.clone(),
            production_verified: outcome.production_verified,
            verified_at: now,
            valid_until: attestation.valid_until,
        })
    }

    /// Verify an attestation and bind a DID verification key to the
    /// attested enclave.
    pub async fn bind_key_to_enclave(
        &self,
        did_key_id: &str,
        attestation: &Attestation,
    ) -> Result<TeeKeyBinding, TeeError> {
        if did_key_id.is_empty() {
            return Err(TeeError::KeyBinding("did_key_id is empty".into()));
        }
        let verified = self.verify_attestation(attestation).await?;

        let binding = TeeKeyBinding::from_attestation(
            Uuid::new_v4().to_string(),
            did_key_id.to_string(),
            &verified,
            self.clock.now_unix_secs(),
            self.config.max_attestation_age_secs,
        );
        self.bindings
            .insert(binding.binding_id.clone(), binding.clone());

        tracing::info!(
            binding_id = %binding.binding_id,
            did_key_id = %did_key_id,
            enclave_id = %binding.enclave_key_id,
            "bound key to enclave"
        );
        Ok(binding)
    }

    /// Verify a binding: it must be unexpired, known to the registry,
    /// and its proof must match the commitment recomputed from its own
    /// fields.
    pub fn verify_key_binding(&self, binding: &TeeKeyBinding) -> bool {
        if binding.is_expired(self.clock.now_unix_secs()) {
            return false;
        }
        if !binding.proof_is_consistent() {
            return false;
        }
        self.bindings
            .get(&binding.binding_id)
            .is_some_and(|stored| *stored.value() == *binding)
    }

    /// The live (unexpired) binding for a DID key, if any.
    pub fn find_binding(&self, did_key_id: &str) -> Option<TeeKeyBinding> {
        let now = self.clock.now_unix_secs();
        self.bindings
            .iter()
            .filter(|entry| entry.value().did_key_id == did_key_id)
            .filter(|entry| !entry.value().is_expired(now))
            .max_by_key(|entry| entry.value().bound_at)
            .map(|entry| entry.value().clone())
    }

    /// All bindings (live and expired) for a DID key.
    pub fn list_bindings(&self, did_key_id: &str) -> Vec<TeeKeyBinding> {
        self.bindings
            .iter()
            .filter(|entry| entry.value().did_key_id == did_key_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Remove a binding from the registry.
    pub fn revoke_binding(&self, binding_id: &str) -> bool {
        self.bindings.remove(binding_id).is_some()
    }
}
