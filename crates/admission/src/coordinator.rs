//! The security coordinator: per-tier requirement resolution and the
//! ordered admission pipeline.

use std::sync::Arc;

use aci_core::{Clock, DataClassification, SecurityRequirements, TrustTier};
use aci_dpop::DpopService;
use aci_pairwise::PairwiseDidService;
use aci_revocation::{RevocationService, RevocationStatus};
use aci_tee::TeeBindingService;
use aci_token::{IntrospectionClient, TokenClaims, TokenLifetimeService, TokenType, decode_claims};
use serde::{Deserialize, Serialize};

use crate::types::{AdmissionDecision, AdmissionRequest, CheckError, Component};

/// Coordinator-level policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Refuse attestations that fell back to simulated verification for
    /// tier 5 agents.
    #[serde(default = "default_forbid_simulated_at_tier5")]
    pub forbid_simulated_at_tier5: bool,
}

fn default_forbid_simulated_at_tier5() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            forbid_simulated_at_tier5: default_forbid_simulated_at_tier5(),
        }
    }
}

/// Composes the security services into one request-admission pipeline.
///
/// Phases run in a fixed order (token lifetime, DPoP, introspection,
/// revocation, TEE, pairwise); the first failing phase decides the
/// outcome and later phases do not run. Transient I/O failures in a
/// required check deny the request (fail-closed).
pub struct SecurityCoordinator {
    config: CoordinatorConfig,
    dpop: Arc<DpopService>,
    tee: Arc<TeeBindingService>,
    pairwise: Arc<PairwiseDidService>,
    revocation: Arc<RevocationService>,
    lifetime: Arc<TokenLifetimeService>,
    introspection: Option<Arc<IntrospectionClient>>,
    clock: Arc<dyn Clock>,
}

impl SecurityCoordinator {
    /// Compose a coordinator from its services.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoordinatorConfig,
        dpop: Arc<DpopService>,
        tee: Arc<TeeBindingService>,
        pairwise: Arc<PairwiseDidService>,
        revocation: Arc<RevocationService>,
        lifetime: Arc<TokenLifetimeService>,
        introspection: Option<Arc<IntrospectionClient>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            dpop,
            tee,
            pairwise,
            revocation,
            lifetime,
            introspection,
            clock,
        }
    }

    /// The requirements the coordinator enforces for a tier.
    pub fn requirements_for(&self, tier: TrustTier) -> SecurityRequirements {
        SecurityRequirements::for_tier(tier)
    }

    /// Run the admission pipeline for one request.
    pub async fn validate_request(&self, request: &AdmissionRequest) -> AdmissionDecision {
        let tier = request.trust_tier;
        let requirements = SecurityRequirements::for_tier(tier);
        let high_value = request.action.is_high_value.unwrap_or(false)
            || self
                .lifetime
                .is_high_value_operation(&request.action.action_type, request.action.action_level);

        tracing::debug!(
            request_id = %request.action.request_id,
            agent_did = %request.agent_did,
            tier = %tier,
            high_value,
            "validating request"
        );

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut token_remaining = None;
        let mut token_refresh = None;

        // Phase 1: token lifetime. Also yields the claims later phases
        // read (cnf.jkt for DPoP binding).
        let claims = self.token_phase(
            request,
            high_value,
            &mut errors,
            &mut token_remaining,
            &mut token_refresh,
        );

        // Phase 2: proof of possession.
        if errors.is_empty() && (requirements.dpop_required || high_value) {
            self.dpop_phase(request, claims.as_ref(), &mut errors);
        }

        // Phase 3: live token status. Cheaper cached path runs before
        // the revocation check.
        if errors.is_empty() && self.introspection_needed(request, tier, high_value) {
            self.introspection_phase(request, tier, &mut errors).await;
        }

        // Phase 4: revocation.
        if errors.is_empty() {
            self.revocation_phase(request, tier, high_value, &mut errors);
        }

        // Phase 5: hardware binding.
        if errors.is_empty() && requirements.tee_required {
            self.tee_phase(request, tier, &mut errors).await;
        }

        // Phase 6: pairwise identifier (advisory unless the data
        // classification enforces it).
        if errors.is_empty() {
            self.pairwise_phase(request, &requirements, &mut errors, &mut warnings);
        }

        let valid = errors.is_empty();
        if !valid {
            tracing::debug!(
                request_id = %request.action.request_id,
                code = %errors[0].code,
                component = ?errors[0].component,
                "admission denied"
            );
        }

        AdmissionDecision {
            valid,
            errors,
            warnings,
            security_level: tier.conformance_level(),
            validated_at: self.clock.now_unix_secs(),
            token_remaining_ttl_secs: token_remaining,
            token_should_refresh: token_refresh,
        }
    }

    fn token_phase(
        &self,
        request: &AdmissionRequest,
        high_value: bool,
        errors: &mut Vec<CheckError>,
        remaining: &mut Option<u64>,
        refresh: &mut Option<bool>,
    ) -> Option<TokenClaims> {
        let claims = match decode_claims(&request.access_token) {
            Ok(claims) => claims,
            Err(error) => {
                errors.push(CheckError::new(
                    error.code(),
                    Component::Token,
                    error.to_string(),
                ));
                return None;
            }
        };

        match self.lifetime.validate_lifetime(
            &claims,
            TokenType::Access,
            high_value,
            Some(request.trust_tier),
        ) {
            Ok(report) => {
                *remaining = Some(report.remaining_ttl_secs);
                *refresh = Some(report.should_refresh);
            }
            Err(error) => {
                errors.push(CheckError::new(
                    error.code(),
                    Component::Token,
                    error.to_string(),
                ));
            }
        }
        Some(claims)
    }

    fn dpop_phase(
        &self,
        request: &AdmissionRequest,
        claims: Option<&TokenClaims>,
        errors: &mut Vec<CheckError>,
    ) {
        let Some(proof) = request.dpop_proof.as_deref() else {
            errors.push(CheckError::new(
                "INVALID_FORMAT",
                Component::Dpop,
                "dpop proof required but not presented",
            ));
            return;
        };

        let token_jkt = claims.and_then(TokenClaims::jkt);
        let result = if token_jkt.is_some() {
            // A key-bound token requires the full bound-proof check.
            self.dpop.validate_bound_token(
                &request.access_token,
                proof,
                &request.action.method,
                &request.action.uri,
                token_jkt,
            )
        } else {
            self.dpop.verify_proof(
                proof,
                &request.action.method,
                &request.action.uri,
                None,
            )
        };

        if let Err(error) = result {
            errors.push(CheckError::new(
                error.code(),
                Component::Dpop,
                error.to_string(),
            ));
        }
    }

    fn introspection_needed(
        &self,
        request: &AdmissionRequest,
        tier: TrustTier,
        high_value: bool,
    ) -> bool {
        high_value
            || self.revocation.sla_for(tier).introspection_required
            || self.lifetime.requires_introspection(
                &request.action.action_type,
                request.action.action_level,
                tier,
            )
    }

    async fn introspection_phase(
        &self,
        request: &AdmissionRequest,
        tier: TrustTier,
        errors: &mut Vec<CheckError>,
    ) {
        let Some(client) = &self.introspection else {
            // Required but not wired up: fail closed.
            errors.push(CheckError::new(
                "INTROSPECTION_ERROR",
                Component::Introspection,
                "introspection required but no endpoint is configured",
            ));
            return;
        };

        let max_age_ms = self.revocation.sla_for(tier).max_propagation_latency_ms;
        match client
            .cached_introspect(&request.access_token, Some(max_age_ms))
            .await
        {
            Ok(outcome) if outcome.result.active => {}
            Ok(_) => {
                errors.push(CheckError::new(
                    "TOKEN_INACTIVE",
                    Component::Introspection,
                    "token is not active at the issuer",
                ));
            }
            Err(error) => {
                errors.push(CheckError::new(
                    error.code(),
                    Component::Introspection,
                    error.to_string(),
                ));
            }
        }
    }

    fn revocation_phase(
        &self,
        request: &AdmissionRequest,
        tier: TrustTier,
        high_value: bool,
        errors: &mut Vec<CheckError>,
    ) {
        let revoked = if self.revocation.requires_sync_check(tier, high_value) {
            self.revocation.sync_revocation_check(&request.agent_did)
        } else {
            self.revocation.check_revocation_status(&request.agent_did, Some(tier))
                != RevocationStatus::Active
        };

        if revoked {
            errors.push(CheckError::new(
                "AGENT_REVOKED",
                Component::Revocation,
                format!("agent {} is revoked", request.agent_did),
            ));
        }
    }

    async fn tee_phase(
        &self,
        request: &AdmissionRequest,
        tier: TrustTier,
        errors: &mut Vec<CheckError>,
    ) {
        let Some(attestation) = &request.attestation else {
            errors.push(CheckError::new(
                "TEE_ATTESTATION_ERROR",
                Component::Tee,
                "attestation required but not presented",
            ));
            return;
        };

        let verified = match self.tee.verify_attestation(attestation).await {
            Ok(verified) => verified,
            Err(error) => {
                errors.push(CheckError::new(
                    error.code(),
                    Component::Tee,
                    error.to_string(),
                ));
                return;
            }
        };

        if !verified.production_verified
            && tier >= TrustTier::T5
            && self.config.forbid_simulated_at_tier5
        {
            errors.push(CheckError::new(
                "TEE_ATTESTATION_ERROR",
                Component::Tee,
                "simulated attestation fallback is not acceptable at tier 5",
            ));
            return;
        }

        let did_key_id = request
            .did_key_id
            .as_deref()
            .unwrap_or(request.agent_did.as_str());
        let Some(binding) = self.tee.find_binding(did_key_id) else {
            errors.push(CheckError::new(
                "TEE_KEY_BINDING_ERROR",
                Component::Tee,
                format!("no live enclave binding for {did_key_id}"),
            ));
            return;
        };

        if binding.enclave_key_id != verified.enclave_id || !self.tee.verify_key_binding(&binding) {
            errors.push(CheckError::new(
                "TEE_KEY_BINDING_ERROR",
                Component::Tee,
                format!("binding for {did_key_id} does not match the attested enclave"),
            ));
        }
    }

    fn pairwise_phase(
        &self,
        request: &AdmissionRequest,
        requirements: &SecurityRequirements,
        errors: &mut Vec<CheckError>,
        warnings: &mut Vec<String>,
    ) {
        let classification = request
            .action
            .data_classification
            .as_deref()
            .and_then(DataClassification::from_label);
        let enforced = classification.is_some_and(DataClassification::requires_pairwise);

        let presented_pairwise = request
            .pairwise_did
            .as_deref()
            .is_some_and(|did| did != request.agent_did && did.starts_with("did:key:z"));

        if enforced && !presented_pairwise {
            errors.push(CheckError::new(
                "PAIRWISE_DID_ERROR",
                Component::Pairwise,
                format!(
                    "{} data requires a pairwise identifier, not the master DID",
                    classification.map(|c| c.to_string()).unwrap_or_default()
                ),
            ));
            return;
        }

        if requirements.pairwise_required && !presented_pairwise {
            warnings.push(format!(
                "tier {} expects pairwise identifiers toward relying parties",
                requirements.tier
            ));
        }
    }

    /// The pairwise service, for deriving identifiers ahead of a call.
    pub fn pairwise(&self) -> &Arc<PairwiseDidService> {
        &self.pairwise
    }
}
