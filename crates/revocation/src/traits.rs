//! Narrow interfaces to the external collaborators the revocation
//! engine drives.

use async_trait::async_trait;

use crate::error::RevocationError;

/// One delegation edge in the delegation graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    /// The DID the capability was delegated to.
    pub delegate_did: String,
    /// Registry identifier of the delegation itself.
    pub delegation_id: String,
}

/// The external delegation registry.
#[async_trait]
pub trait DelegationRegistry: Send + Sync {
    /// Outgoing delegations from a DID.
    async fn get_delegations_from(&self, did: &str) -> Result<Vec<Delegation>, RevocationError>;

    /// Revoke a single delegation.
    async fn revoke_delegation(
        &self,
        delegation_id: &str,
        reason: &str,
    ) -> Result<(), RevocationError>;
}

/// The external token issuer's invalidation interface.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Invalidate all live tokens for an agent, returning how many were
    /// invalidated.
    async fn invalidate_for_agent(&self, did: &str) -> Result<u64, RevocationError>;
}

/// The external webhook dispatcher.
#[async_trait]
pub trait WebhookService: Send + Sync {
    /// Deliver a revocation notification.
    async fn notify(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), RevocationError>;
}
