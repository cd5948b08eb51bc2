//! Revocation request/result/record shapes.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a DID in the revocation registry.
///
/// A DID absent from the registry is reported as `Active`; `Pending`
/// marks a principal whose propagation is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationStatus {
    /// Not revoked.
    Active,
    /// Revoked; requests must be denied.
    Revoked,
    /// Revocation accepted but propagation has not completed.
    Pending,
}

/// A revocation registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    /// The DID this record is about.
    pub did: String,
    /// Current status.
    pub status: RevocationStatus,
    /// Unix seconds when the DID was revoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<u64>,
    /// Operator-supplied reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// How a revocation propagates through the delegation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationPolicy {
    /// Recursively revoke everything delegated from the revoked DID.
    pub terminate_descendants: bool,
    /// Delay before descendant termination begins. Applies only to the
    /// principal; recursive steps run without a grace period.
    pub grace_period_ms: u64,
    /// Hand the revocation to the webhook service once recorded.
    pub notify_webhooks: bool,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            terminate_descendants: true,
            grace_period_ms: 0,
            notify_webhooks: false,
        }
    }
}

/// A request to revoke an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationRequest {
    /// The DID to revoke.
    pub revoked_did: String,
    /// Why the agent is being revoked.
    pub reason: String,
    /// Propagation behavior.
    #[serde(default)]
    pub propagation_policy: PropagationPolicy,
}

/// Outcome of a revocation, including everything it propagated to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationResult {
    /// Unique id for this propagation.
    pub revocation_id: String,
    /// The principal DID that was revoked.
    pub revoked_did: String,
    /// Every descendant DID revoked by the propagation, in traversal
    /// order.
    pub descendants_revoked: Vec<String>,
    /// Sum of per-agent token invalidation counts.
    pub tokens_invalidated: u64,
    /// Whether every propagation step succeeded. The principal
    /// revocation holds even when this is `false`.
    pub propagation_complete: bool,
    /// Unix seconds when the propagation finished.
    pub timestamp: u64,
}
