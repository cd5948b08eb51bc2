//! Admission request and decision shapes.

use aci_core::{ConformanceLevel, TrustTier};
use aci_tee::Attestation;
use serde::{Deserialize, Serialize};

/// The action an agent is attempting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Caller-supplied request correlation id.
    pub request_id: String,
    /// HTTP method of the request.
    pub method: String,
    /// Absolute request URI.
    pub uri: String,
    /// Action label (matched against the high-value set).
    pub action_type: String,
    /// Action sensitivity level, 0-5.
    #[serde(default)]
    pub action_level: u8,
    /// Freeform data-classification label, if the caller knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_classification: Option<String>,
    /// Explicit high-value marking; ORed with label/level detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_high_value: Option<bool>,
}

/// Everything the coordinator needs to admit or deny a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    /// The agent's master DID.
    pub agent_did: String,
    /// The agent's trust tier, assigned by external policy.
    pub trust_tier: TrustTier,
    /// The attempted action.
    pub action: ActionRequest,
    /// The presented access token.
    pub access_token: String,
    /// DPoP proof header value, when the tier requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpop_proof: Option<String>,
    /// Hardware attestation, when the tier requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
    /// The DID verification-method key bound to the enclave. Defaults
    /// to the agent DID when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_key_id: Option<String>,
    /// The pairwise DID presented to the relying party, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairwise_did: Option<String>,
}

/// The sub-check a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// DPoP proof-of-possession.
    Dpop,
    /// TEE attestation binding.
    Tee,
    /// Pairwise DID enforcement.
    Pairwise,
    /// Revocation status.
    Revocation,
    /// Token lifetime.
    Token,
    /// Token introspection.
    Introspection,
}

/// One structured sub-check failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckError {
    /// Stable error code (e.g. `REPLAY`, `AGENT_REVOKED`).
    pub code: String,
    /// Which sub-check produced the failure.
    pub component: Component,
    /// Human-readable detail.
    pub message: String,
}

impl CheckError {
    /// Build a check error.
    pub fn new(code: impl Into<String>, component: Component, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            component,
            message: message.into(),
        }
    }
}

/// The coordinator's admit/deny decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// Whether the request is admitted.
    pub valid: bool,
    /// Ordered sub-check failures; empty when admitted.
    pub errors: Vec<CheckError>,
    /// Advisory findings that did not deny the request.
    pub warnings: Vec<String>,
    /// The conformance level that was enforced.
    pub security_level: ConformanceLevel,
    /// Unix seconds when validation completed.
    pub validated_at: u64,
    /// Seconds until the access token expires, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_remaining_ttl_secs: Option<u64>,
    /// Whether the caller should refresh the access token now.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_should_refresh: Option<bool>,
}
