//! The revocation engine.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use aci_core::{Clock, TrustTier};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::RevocationStatusCache;
use crate::error::RevocationError;
use crate::events::{EventBus, RevocationEvent, RevocationEventType, Subscription};
use crate::sla::RevocationSla;
use crate::traits::{DelegationRegistry, TokenService, WebhookService};
use crate::types::{RevocationRecord, RevocationRequest, RevocationResult, RevocationStatus};

/// Configuration for [`RevocationService`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RevocationConfig {
    /// Per-tier SLA overrides; tiers without an entry use the defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sla_overrides: BTreeMap<u8, RevocationSla>,
}

impl RevocationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), RevocationError> {
        if self.sla_overrides.keys().any(|t| *t > 5) {
            return Err(RevocationError::Config(
                "sla_overrides keys must be tiers 0-5".into(),
            ));
        }
        if self
            .sla_overrides
            .values()
            .any(|sla| sla.max_propagation_latency_ms == 0 && !sla.sync_check_required)
        {
            return Err(RevocationError::Config(
                "a zero-latency SLA must require sync checks".into(),
            ));
        }
        Ok(())
    }
}

/// Revocation engine with recursive propagation and SLA-aware reads.
pub struct RevocationService {
    config: RevocationConfig,
    registry: DashMap<String, RevocationRecord>,
    cache: RevocationStatusCache,
    delegations: Arc<dyn DelegationRegistry>,
    tokens: Arc<dyn TokenService>,
    webhooks: Option<Arc<dyn WebhookService>>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl RevocationService {
    /// Create a service over the external collaborators.
    pub fn new(
        config: RevocationConfig,
        delegations: Arc<dyn DelegationRegistry>,
        tokens: Arc<dyn TokenService>,
        webhooks: Option<Arc<dyn WebhookService>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RevocationError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: DashMap::new(),
            cache: RevocationStatusCache::new(clock.clone()),
            delegations,
            tokens,
            webhooks,
            events: EventBus::new(),
            clock,
        })
    }

    /// The effective SLA for a tier.
    pub fn sla_for(&self, tier: TrustTier) -> RevocationSla {
        self.config
            .sla_overrides
            .get(&tier.value())
            .copied()
            .unwrap_or_else(|| RevocationSla::for_tier(tier))
    }

    /// Whether a status check must bypass the cache for this tier and
    /// operation value.
    pub fn requires_sync_check(&self, tier: TrustTier, is_high_value: bool) -> bool {
        self.sla_for(tier).sync_check_required || (is_high_value && tier.value() >= 2)
    }

    /// Subscribe to revocation events. The returned token unsubscribes
    /// via [`RevocationService::unsubscribe`].
    pub fn on_revocation<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RevocationEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Remove an event subscription.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    /// Revoke an agent and propagate per the request's policy.
    ///
    /// Descendant failures are recorded in `propagation_complete` but do
    /// not undo the principal revocation.
    pub async fn revoke_agent(
        &self,
        request: RevocationRequest,
    ) -> Result<RevocationResult, RevocationError> {
        let revocation_id = Uuid::new_v4().to_string();
        let principal = request.revoked_did.clone();
        let reason = request.reason.clone();
        let mut propagation_complete = true;

        tracing::info!(
            revocation_id = %revocation_id,
            did = %principal,
            reason = %reason,
            "revoking agent"
        );

        // Mark the principal pending so concurrent readers see the
        // revocation in flight rather than a stale Active.
        self.write_record(&principal, RevocationStatus::Pending, Some(reason.clone()));

        let mut descendants = Vec::new();
        if request.propagation_policy.terminate_descendants {
            if request.propagation_policy.grace_period_ms > 0 {
                tokio::time::sleep(Duration::from_millis(
                    request.propagation_policy.grace_period_ms,
                ))
                .await;
            }
            propagation_complete &= self
                .terminate_descendants(&revocation_id, &principal, &reason, &mut descendants)
                .await;
        }

        // Token invalidation for the principal and every descendant.
        let mut tokens_invalidated = 0u64;
        for did in std::iter::once(&principal).chain(descendants.iter()) {
            match self.tokens.invalidate_for_agent(did).await {
                Ok(count) => {
                    tokens_invalidated += count;
                    if count > 0 {
                        self.emit(
                            RevocationEventType::TokenInvalidated,
                            &revocation_id,
                            did,
                            &reason,
                            serde_json::json!({ "count": count }),
                        );
                    }
                }
                Err(error) => {
                    propagation_complete = false;
                    tracing::warn!(did = %did, error = %error, "token invalidation failed");
                }
            }
        }

        // The principal's registry entry becomes Revoked only after all
        // descendants are observable, so a reader that sees the
        // principal revoked can rely on the subtree being revoked too.
        self.write_record(&principal, RevocationStatus::Revoked, Some(reason.clone()));

        self.emit(
            RevocationEventType::AgentRevoked,
            &revocation_id,
            &principal,
            &reason,
            serde_json::json!({ "descendants": descendants.len() }),
        );

        let result = RevocationResult {
            revocation_id: revocation_id.clone(),
            revoked_did: principal.clone(),
            descendants_revoked: descendants,
            tokens_invalidated,
            propagation_complete,
            timestamp: self.clock.now_unix_secs(),
        };

        if request.propagation_policy.notify_webhooks {
            self.notify_webhook(&result, &reason).await;
        }

        Ok(result)
    }

    /// BFS over the delegation graph, revoking every reachable
    /// delegation. Returns `false` if any step failed.
    async fn terminate_descendants(
        &self,
        revocation_id: &str,
        principal: &str,
        reason: &str,
        revoked: &mut Vec<String>,
    ) -> bool {
        let mut complete = true;
        let mut visited: HashSet<String> = HashSet::from([principal.to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([principal.to_string()]);

        while let Some(current) = queue.pop_front() {
            let delegations = match self.delegations.get_delegations_from(&current).await {
                Ok(delegations) => delegations,
                Err(error) => {
                    complete = false;
                    tracing::warn!(did = %current, error = %error, "delegation lookup failed");
                    continue;
                }
            };

            for delegation in delegations {
                if !visited.insert(delegation.delegate_did.clone()) {
                    continue;
                }
                let descendant_reason = format!("{reason} (revoked ancestor: {current})");

                if let Err(error) = self
                    .delegations
                    .revoke_delegation(&delegation.delegation_id, &descendant_reason)
                    .await
                {
                    complete = false;
                    tracing::warn!(
                        delegation_id = %delegation.delegation_id,
                        error = %error,
                        "delegation revocation failed"
                    );
                    continue;
                }

                self.write_record(
                    &delegation.delegate_did,
                    RevocationStatus::Revoked,
                    Some(descendant_reason.clone()),
                );
                self.emit(
                    RevocationEventType::DelegationTerminated,
                    revocation_id,
                    &delegation.delegate_did,
                    &descendant_reason,
                    serde_json::json!({ "delegation_id": delegation.delegation_id }),
                );

                revoked.push(delegation.delegate_did.clone());
                queue.push_back(delegation.delegate_did);
            }
        }

        complete
    }

    /// Status check honoring the tier's SLA.
    ///
    /// Sync-required tiers always read the registry; other tiers may be
    /// served from the cache within the SLA's latency bound.
    pub fn check_revocation_status(
        &self,
        did: &str,
        tier: Option<TrustTier>,
    ) -> RevocationStatus {
        let sla = self.sla_for(tier.unwrap_or(TrustTier::T0));
        if !sla.sync_check_required {
            if let Some(status) = self.cache.get(did, sla.max_propagation_latency_ms) {
                return status;
            }
        }

        let status = self.registry_status(did);
        self.cache.insert(did, status);
        status
    }

    /// Cache-bypassing check. Returns `true` iff the DID is revoked.
    pub fn sync_revocation_check(&self, did: &str) -> bool {
        let status = self.registry_status(did);
        self.cache.insert(did, status);
        status == RevocationStatus::Revoked
    }

    /// The registry record for a DID, if any.
    pub fn get_record(&self, did: &str) -> Option<RevocationRecord> {
        self.registry.get(did).map(|record| record.clone())
    }

    /// Drop status-cache entries older than `retention_ms`.
    pub fn sweep_cache(&self, retention_ms: u64) {
        self.cache.sweep(retention_ms);
    }

    fn registry_status(&self, did: &str) -> RevocationStatus {
        // A DID with no registry entry has never been revoked.
        self.registry
            .get(did)
            .map_or(RevocationStatus::Active, |record| record.status)
    }

    fn write_record(&self, did: &str, status: RevocationStatus, reason: Option<String>) {
        let revoked_at = match status {
            RevocationStatus::Revoked => Some(self.clock.now_unix_secs()),
            _ => None,
        };
        self.registry.insert(
            did.to_string(),
            RevocationRecord {
                did: did.to_string(),
                status,
                revoked_at,
                reason,
            },
        );
        // Cache invalidation is synchronous with the registry write.
        self.cache.invalidate(did);
    }

    fn emit(
        &self,
        event_type: RevocationEventType,
        revocation_id: &str,
        did: &str,
        reason: &str,
        metadata: serde_json::Value,
    ) {
        self.events.emit(&RevocationEvent {
            event_type,
            revocation_id: revocation_id.to_string(),
            did: did.to_string(),
            reason: reason.to_string(),
            timestamp: self.clock.now_unix_secs(),
            metadata,
        });
    }

    async fn notify_webhook(&self, result: &RevocationResult, reason: &str) {
        let Some(webhooks) = &self.webhooks else {
            return;
        };
        let payload = serde_json::json!({
            "type": RevocationEventType::AgentRevoked.as_str(),
            "revocation_id": result.revocation_id,
            "did": result.revoked_did,
            "reason": reason,
            "timestamp": result.timestamp,
            "metadata": {
                "descendants_revoked": result.descendants_revoked,
                "tokens_invalidated": result.tokens_invalidated,
            },
        });
        if let Err(error) = webhooks
            .notify(RevocationEventType::AgentRevoked.as_str(), payload)
            .await
        {
            // Webhook failures never fail the propagation.
            tracing::warn!(
                revocation_id = %result.revocation_id,
                error = %error,
                "revocation webhook delivery failed"
            );
        }
    }
}
