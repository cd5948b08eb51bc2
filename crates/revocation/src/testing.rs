//! In-memory collaborator implementations for tests and local runs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::RevocationError;
use crate::traits::{Delegation, DelegationRegistry, TokenService, WebhookService};

/// In-memory delegation graph.
#[derive(Default)]
pub struct InMemoryDelegationRegistry {
    edges: DashMap<String, Vec<Delegation>>,
    revoked: DashMap<String, String>,
    fail_lookups: AtomicBool,
}

impl InMemoryDelegationRegistry {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delegation edge `from -> to`.
    pub fn add_delegation(&self, from: &str, to: &str, delegation_id: &str) {
        self.edges.entry(from.to_string()).or_default().push(Delegation {
            delegate_did: to.to_string(),
            delegation_id: delegation_id.to_string(),
        });
    }

    /// The reason a delegation was revoked with, if it was.
    pub fn revocation_reason(&self, delegation_id: &str) -> Option<String> {
        self.revoked.get(delegation_id).map(|r| r.clone())
    }

    /// Make subsequent lookups fail, to exercise partial propagation.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DelegationRegistry for InMemoryDelegationRegistry {
    async fn get_delegations_from(&self, did: &str) -> Result<Vec<Delegation>, RevocationError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(RevocationError::DelegationRegistry(
                "registry unavailable".into(),
            ));
        }
        Ok(self
            .edges
            .get(did)
            .map(|edges| edges.clone())
            .unwrap_or_default())
    }

    async fn revoke_delegation(
        &self,
        delegation_id: &str,
        reason: &str,
    ) -> Result<(), RevocationError> {
        self.revoked
            .insert(delegation_id.to_string(), reason.to_string());
        Ok(())
    }
}

/// Token service double that reports a fixed count per agent.
#[derive(Default)]
pub struct InMemoryTokenService {
    counts: DashMap<String, u64>,
}

impl InMemoryTokenService {
    /// Create a service with no live tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many live tokens an agent holds.
    pub fn set_live_tokens(&self, did: &str, count: u64) {
        self.counts.insert(did.to_string(), count);
    }
}

#[async_trait]
impl TokenService for InMemoryTokenService {
    async fn invalidate_for_agent(&self, did: &str) -> Result<u64, RevocationError> {
        Ok(self.counts.remove(did).map_or(0, |(_, count)| count))
    }
}

/// Webhook double that records every delivery.
#[derive(Default)]
pub struct RecordingWebhookService {
    deliveries: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    fail: AtomicBool,
}

impl RecordingWebhookService {
    /// Create a recording webhook sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, as `(event_type, payload)` pairs.
    pub fn deliveries(&self) -> Vec<(String, serde_json::Value)> {
        self.deliveries.lock().clone()
    }

    /// Make subsequent deliveries fail.
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// A map of event type to delivery count.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (event_type, _) in self.deliveries.lock().iter() {
            *counts.entry(event_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl WebhookService for RecordingWebhookService {
    async fn notify(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), RevocationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RevocationError::Webhook("delivery refused".into()));
        }
        self.deliveries
            .lock()
            .push((event_type.to_string(), payload));
        Ok(())
    }
}
