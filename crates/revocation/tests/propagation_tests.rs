//! Propagation and SLA tests for the revocation engine.

use std::sync::{Arc, Mutex};

use aci_core::{ManualClock, TrustTier};
use aci_revocation::testing::{
    InMemoryDelegationRegistry, InMemoryTokenService, RecordingWebhookService,
};
use aci_revocation::{
    PropagationPolicy, RevocationConfig, RevocationEventType, RevocationRequest,
    RevocationService, RevocationStatus,
};

struct Fixture {
    clock: Arc<ManualClock>,
    delegations: Arc<InMemoryDelegationRegistry>,
    tokens: Arc<InMemoryTokenService>,
    webhooks: Arc<RecordingWebhookService>,
    service: RevocationService,
}

fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let delegations = Arc::new(InMemoryDelegationRegistry::new());
    let tokens = Arc::new(InMemoryTokenService::new());
    let webhooks = Arc::new(RecordingWebhookService::new());
    let service = RevocationService::new(
        RevocationConfig::default(),
        delegations.clone(),
        tokens.clone(),
        Some(webhooks.clone()),
        clock.clone(),
    )
    .unwrap();
    Fixture {
        clock,
        delegations,
        tokens,
        webhooks,
        service,
    }
}

fn request(did: &str, notify_webhooks: bool) -> RevocationRequest {
    RevocationRequest {
        revoked_did: did.to_string(),
        reason: "incident".to_string(),
        propagation_policy: PropagationPolicy {
            terminate_descendants: true,
            grace_period_ms: 0,
            notify_webhooks,
        },
    }
}

#[tokio::test]
async fn recursive_propagation_covers_grandchildren() {
    let f = fixture();
    f.delegations.add_delegation("A", "B", "del-ab");
    f.delegations.add_delegation("B", "C", "del-bc");

    let result = f.service.revoke_agent(request("A", false)).await.unwrap();

    assert_eq!(result.revoked_did, "A");
    assert!(result.descendants_revoked.contains(&"B".to_string()));
    assert!(result.descendants_revoked.contains(&"C".to_string()));
    assert!(result.propagation_complete);

    assert!(f.service.sync_revocation_check("A"));
    assert!(f.service.sync_revocation_check("B"));
    assert!(f.service.sync_revocation_check("C"));
}

#[tokio::test]
async fn descendant_reason_names_ancestor() {
    let f = fixture();
    f.delegations.add_delegation("A", "B", "del-ab");

    f.service.revoke_agent(request("A", false)).await.unwrap();

    let reason = f.delegations.revocation_reason("del-ab").unwrap();
    assert!(reason.contains("incident"));
    assert!(reason.contains("A"));

    let record = f.service.get_record("B").unwrap();
    assert_eq!(record.status, RevocationStatus::Revoked);
    assert!(record.reason.unwrap().contains("revoked ancestor: A"));
}

#[tokio::test]
async fn delegation_cycles_terminate() {
    let f = fixture();
    f.delegations.add_delegation("A", "B", "del-ab");
    f.delegations.add_delegation("B", "A", "del-ba");
    f.delegations.add_delegation("B", "C", "del-bc");

    let result = f.service.revoke_agent(request("A", false)).await.unwrap();
    assert_eq!(result.descendants_revoked.len(), 2);
}

#[tokio::test]
async fn tokens_invalidated_sums_subtree() {
    let f = fixture();
    f.delegations.add_delegation("A", "B", "del-ab");
    f.tokens.set_live_tokens("A", 3);
    f.tokens.set_live_tokens("B", 2);

    let result = f.service.revoke_agent(request("A", false)).await.unwrap();
    assert_eq!(result.tokens_invalidated, 5);
}

#[tokio::test]
async fn events_arrive_in_order_before_return() {
    let f = fixture();
    f.delegations.add_delegation("A", "B", "del-ab");
    f.tokens.set_live_tokens("B", 1);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    f.service.on_revocation(move |event| {
        seen2
            .lock()
            .unwrap()
            .push((event.event_type, event.did.clone()));
    });

    f.service.revoke_agent(request("A", false)).await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&(RevocationEventType::DelegationTerminated, "B".into())));
    assert!(seen.contains(&(RevocationEventType::TokenInvalidated, "B".into())));
    assert!(seen.contains(&(RevocationEventType::AgentRevoked, "A".into())));
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let f = fixture();
    let seen = Arc::new(Mutex::new(0usize));
    let seen2 = seen.clone();
    let sub = f.service.on_revocation(move |_| {
        *seen2.lock().unwrap() += 1;
    });

    f.service.revoke_agent(request("A", false)).await.unwrap();
    let after_first = *seen.lock().unwrap();
    assert!(after_first >= 1);

    assert!(f.service.unsubscribe(sub));
    f.service.revoke_agent(request("B", false)).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), after_first);
}

#[tokio::test]
async fn webhook_notified_and_failures_tolerated() {
    let f = fixture();
    f.service.revoke_agent(request("A", true)).await.unwrap();

    let deliveries = f.webhooks.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "agent.revoked");
    assert_eq!(deliveries[0].1["did"], "A");

    // A failing webhook never fails the propagation.
    f.webhooks.fail_deliveries(true);
    let result = f.service.revoke_agent(request("B", true)).await.unwrap();
    assert!(result.propagation_complete);
    assert!(f.service.sync_revocation_check("B"));
}

#[tokio::test]
async fn partial_propagation_still_revokes_principal() {
    let f = fixture();
    f.delegations.add_delegation("A", "B", "del-ab");
    f.delegations.fail_lookups(true);

    let result = f.service.revoke_agent(request("A", false)).await.unwrap();
    assert!(!result.propagation_complete);
    assert!(result.descendants_revoked.is_empty());
    assert!(f.service.sync_revocation_check("A"));
}

#[tokio::test]
async fn cached_status_respects_tier_sla() {
    let f = fixture();

    // Prime the cache with an Active reading for a T2 caller (30s SLA).
    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T2)),
        RevocationStatus::Active
    );

    f.service.revoke_agent(request("A", false)).await.unwrap();

    // The revocation write invalidated the cache entry, so even the
    // cached path sees Revoked immediately.
    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T2)),
        RevocationStatus::Revoked
    );
}

#[tokio::test]
async fn stale_cache_expires_within_sla() {
    let f = fixture();

    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T2)),
        RevocationStatus::Active
    );

    // Within the SLA the cached value is served.
    f.clock.advance_millis(10_000);
    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T2)),
        RevocationStatus::Active
    );

    // Beyond the 30s T2 SLA the entry is too stale and is re-read.
    f.clock.advance_millis(25_000);
    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T2)),
        RevocationStatus::Active
    );

    // Retention sweep drops entries older than the bound.
    f.clock.advance_millis(120_000);
    f.service.sweep_cache(60_000);
    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T2)),
        RevocationStatus::Active
    );
}

#[tokio::test]
async fn sync_tiers_bypass_cache() {
    let f = fixture();
    assert!(f.service.requires_sync_check(TrustTier::T4, false));
    assert!(f.service.requires_sync_check(TrustTier::T2, true));
    assert!(!f.service.requires_sync_check(TrustTier::T2, false));
    assert!(!f.service.requires_sync_check(TrustTier::T1, true));

    assert_eq!(
        f.service.check_revocation_status("A", Some(TrustTier::T5)),
        RevocationStatus::Active
    );
}

#[tokio::test]
async fn absent_did_reports_active() {
    let f = fixture();
    assert_eq!(
        f.service.check_revocation_status("did:aci:unknown", None),
        RevocationStatus::Active
    );
    assert!(!f.service.sync_revocation_check("did:aci:unknown"));
}
