//! End-to-end tests for DPoP proof generation and verification.

use std::sync::Arc;

use aci_core::{ManualClock, TrustTier};
use aci_dpop::{
    DpopAlgorithm, DpopConfig, DpopError, DpopKeyPair, DpopService, InMemoryJtiCache,
    access_token_hash,
};

const METHOD: &str = "POST";
const URI: &str = "https://api.example.com/v1/x";

fn service_at(secs: u64) -> (Arc<ManualClock>, DpopService) {
    let clock = Arc::new(ManualClock::at_secs(secs));
    let cache = Arc::new(InMemoryJtiCache::new(clock.clone()));
    let service = DpopService::new(DpopConfig::default(), cache, clock.clone());
    (clock, service)
}

#[test]
fn first_verification_succeeds_then_replays() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();

    let verified = service.verify_proof(&proof, METHOD, URI, None).unwrap();
    assert_eq!(verified.thumbprint, key.thumbprint());

    let err = service.verify_proof(&proof, METHOD, URI, None).unwrap_err();
    assert!(matches!(err, DpopError::Replay(_)));
    assert_eq!(err.code(), "REPLAY");
}

#[test]
fn replay_window_expires_with_proof_age() {
    let (clock, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
    service.verify_proof(&proof, METHOD, URI, None).unwrap();

    // Past the replay window the jti entry is gone, but the proof itself
    // is now too old to accept.
    clock.advance_secs(400);
    let err = service.verify_proof(&proof, METHOD, URI, None).unwrap_err();
    assert!(matches!(err, DpopError::Expired { .. }));
}

#[test]
fn method_mismatch_is_rejected() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
    let err = service.verify_proof(&proof, "GET", URI, None).unwrap_err();
    assert!(matches!(err, DpopError::MethodMismatch { .. }));
    assert_eq!(err.code(), "METHOD_MISMATCH");
}

#[test]
fn method_comparison_ignores_case() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es384);

    let proof = service.generate_proof(&key, "post", URI, None).unwrap();
    assert!(service.verify_proof(&proof, "POST", URI, None).is_ok());
}

#[test]
fn uri_comparison_is_byte_exact() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
    let err = service
        .verify_proof(&proof, METHOD, "https://api.example.com/v1/x/", None)
        .unwrap_err();
    assert!(matches!(err, DpopError::UriMismatch { .. }));
}

#[test]
fn all_curves_round_trip() {
    for alg in [
        DpopAlgorithm::Es256,
        DpopAlgorithm::Es384,
        DpopAlgorithm::Es512,
    ] {
        let (_, service) = service_at(1_700_000_000);
        let key = DpopKeyPair::generate(alg);
        let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
        let verified = service.verify_proof(&proof, METHOD, URI, None).unwrap();
        assert_eq!(verified.thumbprint, key.thumbprint());
    }
}

#[test]
fn tampered_payload_fails_signature() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
    let mut parts: Vec<&str> = proof.split('.').collect();

    use base64::Engine as _;
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let mut claims: serde_json::Value =
        serde_json::from_slice(&engine.decode(parts[1]).unwrap()).unwrap();
    claims["htu"] = serde_json::Value::String("https://evil.example.com/".into());
    let forged = engine.encode(serde_json::to_vec(&claims).unwrap());
    parts[1] = &forged;
    let tampered = parts.join(".");

    let err = service
        .verify_proof(&tampered, METHOD, "https://evil.example.com/", None)
        .unwrap_err();
    assert!(matches!(err, DpopError::InvalidSignature));
}

#[test]
fn future_dated_proof_rejected() {
    let (clock, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
    // Wind the verifier's clock back past the skew tolerance.
    clock.set_millis(1_699_999_000_000);
    let err = service.verify_proof(&proof, METHOD, URI, None).unwrap_err();
    assert!(matches!(err, DpopError::InvalidFormat(_)));
}

#[test]
fn bound_token_requires_matching_ath() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);
    let token = "opaque-access-token";

    let proof = service
        .generate_proof(&key, METHOD, URI, Some(access_token_hash(token)))
        .unwrap();

    let verified = service
        .validate_bound_token(token, &proof, METHOD, URI, None)
        .unwrap();
    assert_eq!(verified.thumbprint, key.thumbprint());
}

#[test]
fn bound_token_rejects_wrong_token() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);

    let proof = service
        .generate_proof(&key, METHOD, URI, Some(access_token_hash("token-a")))
        .unwrap();

    let err = service
        .validate_bound_token("token-b", &proof, METHOD, URI, None)
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_FORMAT");
}

#[test]
fn bound_token_enforces_cnf_jkt() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es256);
    let other = DpopKeyPair::generate(DpopAlgorithm::Es256);
    let token = "opaque-access-token";

    let proof = service
        .generate_proof(&key, METHOD, URI, Some(access_token_hash(token)))
        .unwrap();

    let jkt = key.thumbprint();
    assert!(
        service
            .validate_bound_token(token, &proof, METHOD, URI, Some(&jkt))
            .is_ok()
    );

    let proof2 = service
        .generate_proof(&key, METHOD, URI, Some(access_token_hash(token)))
        .unwrap();
    let wrong_jkt = other.thumbprint();
    let err = service
        .validate_bound_token(token, &proof2, METHOD, URI, Some(&wrong_jkt))
        .unwrap_err();
    assert!(matches!(err, DpopError::InvalidFormat(_)));
}

#[test]
fn proof_header_never_carries_private_key() {
    let (_, service) = service_at(1_700_000_000);
    let key = DpopKeyPair::generate(DpopAlgorithm::Es512);

    let proof = service.generate_proof(&key, METHOD, URI, None).unwrap();
    let header_b64 = proof.split('.').next().unwrap();

    use base64::Engine as _;
    let header: serde_json::Value = serde_json::from_slice(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(header_b64)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(header["typ"], "dpop+jwt");
    assert_eq!(header["alg"], "ES512");
    assert!(header["jwk"].get("d").is_none());
}

#[test]
fn disallowed_algorithm_rejected() {
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let cache = Arc::new(InMemoryJtiCache::new(clock.clone()));
    let config = DpopConfig::builder()
        .allowed_algorithms([DpopAlgorithm::Es256])
        .build()
        .unwrap();
    let service = DpopService::new(config, cache, clock.clone());

    // Generation refuses a disallowed key outright.
    let key = DpopKeyPair::generate(DpopAlgorithm::Es384);
    assert!(service.generate_proof(&key, METHOD, URI, None).is_err());

    // A proof produced elsewhere with a disallowed alg is rejected.
    let permissive = DpopService::new(
        DpopConfig::default(),
        Arc::new(InMemoryJtiCache::new(clock.clone())),
        clock,
    );
    let proof = permissive.generate_proof(&key, METHOD, URI, None).unwrap();
    let err = service.verify_proof(&proof, METHOD, URI, None).unwrap_err();
    assert_eq!(err.code(), "INVALID_FORMAT");
}

#[test]
fn is_required_follows_configured_tiers() {
    let (_, service) = service_at(1_700_000_000);
    assert!(!service.is_required(TrustTier::T1));
    assert!(service.is_required(TrustTier::T2));
    assert!(service.is_required(TrustTier::T5));
}
