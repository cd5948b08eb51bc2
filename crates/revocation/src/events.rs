//! Revocation event fan-out.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Kinds of events the revocation engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevocationEventType {
    /// An agent was revoked.
    #[serde(rename = "agent.revoked")]
    AgentRevoked,
    /// A delegation was terminated during propagation.
    #[serde(rename = "delegation.terminated")]
    DelegationTerminated,
    /// Tokens were invalidated for an agent.
    #[serde(rename = "token.invalidated")]
    TokenInvalidated,
}

impl RevocationEventType {
    /// The wire label for this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AgentRevoked => "agent.revoked",
            Self::DelegationTerminated => "delegation.terminated",
            Self::TokenInvalidated => "token.invalidated",
        }
    }
}

/// A revocation event delivered to subscribers and webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub event_type: RevocationEventType,
    /// The propagation this event belongs to.
    pub revocation_id: String,
    /// The DID the event is about.
    pub did: String,
    /// The revocation reason carried with the event.
    pub reason: String,
    /// Unix seconds when the event was produced.
    pub timestamp: u64,
    /// Event-specific extras (e.g. invalidated token counts).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

type Callback = Box<dyn Fn(&RevocationEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; pass it back to
/// [`EventBus::unsubscribe`] to stop deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// Subscriber registry with sequential delivery and fault isolation.
///
/// Callbacks run one after another per event; a panicking callback is
/// logged and does not prevent the remaining callbacks from running.
#[derive(Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<BTreeMap<u64, Callback>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every future event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RevocationEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(id, Box::new(callback));
        Subscription(id)
    }

    /// Remove a subscription. Returns `true` if it was still active.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.subscribers.write().remove(&subscription.0).is_some()
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver an event to all subscribers, sequentially.
    pub fn emit(&self, event: &RevocationEvent) {
        let subscribers = self.subscribers.read();
        for (id, callback) in subscribers.iter() {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if result.is_err() {
                tracing::error!(
                    subscriber = id,
                    event_type = event.event_type.as_str(),
                    "revocation event subscriber panicked"
                );
            }
        }
    }
}
