//! Round-trip and registry tests for pairwise DIDs.

use std::sync::Arc;

use aci_core::{DataClassification, ManualClock};
use aci_pairwise::{DerivationAlgorithm, PairwiseConfig, PairwiseDidService};

const MASTER: &str = "did:aci:agent-42";
const RP: &str = "did:web:api.example.com";
const SALT: &str = "Zm9vYmFyYmF6";

fn service() -> PairwiseDidService {
    PairwiseDidService::new(
        PairwiseConfig::default(),
        Arc::new(ManualClock::at_secs(1_700_000_000)),
    )
    .unwrap()
}

#[test]
fn derivation_round_trip() {
    let service = service();

    let derived = service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();
    assert!(derived.starts_with("did:key:z"));
    assert!(service.validate_pairwise_did(&derived, MASTER, RP, SALT));

    // Re-deriving returns the identical cached DID.
    let again = service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();
    assert_eq!(derived, again);
}

#[test]
fn validation_rejects_wrong_inputs() {
    let service = service();
    let derived = service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();

    assert!(!service.validate_pairwise_did(&derived, MASTER, "did:web:other", SALT));
    assert!(!service.validate_pairwise_did(&derived, MASTER, RP, "d3Jvbmc"));
    assert!(!service.validate_pairwise_did("did:key:zForged", MASTER, RP, SALT));
}

#[test]
fn cached_relationship_survives_salt_change() {
    let service = service();
    let first = service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();
    // The registry is keyed by (master, rp); a different salt on a later
    // call does not produce a new identity for the same relationship.
    let second = service
        .derive_pairwise_did(MASTER, RP, Some("b3RoZXJzYWx0"))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn distinct_relying_parties_get_distinct_dids() {
    let service = service();
    let a = service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();
    let b = service
        .derive_pairwise_did(MASTER, "did:web:billing.example.com", Some(SALT))
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn generated_salt_has_configured_length() {
    let service = service();
    let salt = service.generate_salt();
    use base64::Engine as _;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(salt)
        .unwrap();
    assert_eq!(decoded.len(), 32);
    assert_ne!(service.generate_salt(), service.generate_salt());
}

#[test]
fn sha256_algorithm_round_trip() {
    let config = PairwiseConfig {
        algorithm: DerivationAlgorithm::Sha256,
        ..PairwiseConfig::default()
    };
    let service =
        PairwiseDidService::new(config, Arc::new(ManualClock::at_secs(1_700_000_000))).unwrap();

    let derived = service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();
    assert!(service.validate_pairwise_did(&derived, MASTER, RP, SALT));
}

#[test]
fn registry_operations() {
    let service = service();
    service.derive_pairwise_did(MASTER, RP, Some(SALT)).unwrap();
    service
        .derive_pairwise_did(MASTER, "did:web:two.example.com", None)
        .unwrap();
    service
        .derive_pairwise_did("did:aci:agent-7", RP, None)
        .unwrap();

    let records = service.list_derivations(MASTER);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.master_did == MASTER));

    let record = service.get_relationship(MASTER, RP).unwrap();
    assert_eq!(record.context_salt, SALT);
    assert_eq!(record.created_at, 1_700_000_000);

    assert!(service.revoke_relationship(MASTER, RP));
    assert!(!service.revoke_relationship(MASTER, RP));
    assert_eq!(service.list_derivations(MASTER).len(), 1);
}

#[test]
fn requirement_lookup_by_label() {
    let service = service();

    assert!(service.is_required(DataClassification::Personal));
    assert!(!service.is_required(DataClassification::Business));

    let req = service.get_requirement("phi");
    assert!(req.required);
    assert_eq!(req.classification, Some(DataClassification::Sensitive));

    let req = service.get_requirement("public");
    assert!(!req.required);

    let req = service.get_requirement("mystery");
    assert!(!req.required);
    assert!(req.classification.is_none());
}
