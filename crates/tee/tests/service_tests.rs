//! Tests for the TEE binding service: pre-checks, dispatch, bindings.

use std::collections::BTreeMap;
use std::sync::Arc;

use aci_core::{ManualClock, TrustTier};
use aci_tee::platforms::sgx;
use aci_tee::{Attestation, TeeBindingService, TeeConfig, TeeError, TeePlatform};

const NOW: u64 = 1_700_000_000;

fn service_with(config: TeeConfig) -> (Arc<ManualClock>, TeeBindingService) {
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let service = TeeBindingService::new(config, clock.clone());
    (clock, service)
}

fn trustzone_attestation() -> Attestation {
    Attestation {
        platform: TeePlatform::TrustZone,
        measurement_hash: "ab".repeat(32),
        enclave_id: "ta-1".to_string(),
        timestamp: NOW,
        pcrs: BTreeMap::new(),
        signature: None,
        certificate_chain: Vec::new(),
        valid_until: None,
    }
}

fn sgx_attestation() -> Attestation {
    let mut quote = vec![0u8; 432];
    quote[112..144].copy_from_slice(&[0xab; 32]);
    Attestation {
        platform: TeePlatform::Sgx,
        measurement_hash: "ab".repeat(32),
        enclave_id: "enclave-1".to_string(),
        timestamp: NOW,
        pcrs: BTreeMap::new(),
        signature: Some(quote),
        certificate_chain: Vec::new(),
        valid_until: None,
    }
}

#[tokio::test]
async fn platform_allow_list_enforced() {
    let config = TeeConfig::builder()
        .allow_platforms([TeePlatform::Sgx])
        .build()
        .unwrap();
    let (_, service) = service_with(config);

    let err = service
        .verify_attestation(&trustzone_attestation())
        .await
        .unwrap_err();
    assert!(matches!(err, TeeError::PlatformNotAllowed(_)));
    assert_eq!(err.code(), "TEE_PLATFORM_NOT_ALLOWED");
}

#[tokio::test]
async fn stale_attestation_rejected() {
    let (clock, service) = service_with(TeeConfig::default());
    clock.advance_secs(7200);

    let err = service
        .verify_attestation(&trustzone_attestation())
        .await
        .unwrap_err();
    assert!(matches!(err, TeeError::AttestationExpired { .. }));
    assert_eq!(err.code(), "TEE_EXPIRED");
}

#[tokio::test]
async fn past_valid_until_rejected() {
    let (clock, service) = service_with(TeeConfig::default());
    let mut attestation = trustzone_attestation();
    attestation.valid_until = Some(NOW + 10);
    clock.advance_secs(11);

    let err = service.verify_attestation(&attestation).await.unwrap_err();
    assert!(matches!(err, TeeError::AttestationExpired { .. }));
}

#[tokio::test]
async fn sgx_quote_measurement_pinned() {
    let config = TeeConfig::builder()
        .expect_measurement("enclave-1", "ab".repeat(32))
        .build()
        .unwrap();
    let (_, service) = service_with(config);

    let verified = service.verify_attestation(&sgx_attestation()).await.unwrap();
    assert_eq!(verified.platform, TeePlatform::Sgx);
    assert!(!verified.production_verified);

    let config = TeeConfig::builder()
        .expect_measurement("enclave-1", "ff".repeat(32))
        .build()
        .unwrap();
    let (_, service) = service_with(config);
    let err = service
        .verify_attestation(&sgx_attestation())
        .await
        .unwrap_err();
    assert!(matches!(err, TeeError::MeasurementMismatch { .. }));
    assert_eq!(err.code(), "TEE_MEASUREMENT_MISMATCH");
}

#[test]
fn sgx_quote_parsing_offsets() {
    let mut quote = vec![0u8; 432];
    quote[112..144].copy_from_slice(&[0x11; 32]);
    quote[176..208].copy_from_slice(&[0x22; 32]);
    let body = sgx::parse_quote(&quote).unwrap();
    assert_eq!(body.mr_enclave, "11".repeat(32));
    assert_eq!(body.mr_signer, "22".repeat(32));
}

#[tokio::test]
async fn binding_lifecycle() {
    let (clock, service) = service_with(TeeConfig::default());
    let attestation = trustzone_attestation();

    let binding = service
        .bind_key_to_enclave("did:aci:agent-1#key-1", &attestation)
        .await
        .unwrap();
    assert_eq!(binding.enclave_key_id, "ta-1");
    assert!(binding.proof_is_consistent());
    assert!(service.verify_key_binding(&binding));

    let found = service.find_binding("did:aci:agent-1#key-1").unwrap();
    assert_eq!(found.binding_id, binding.binding_id);

    // Tampered binding fails even while unexpired.
    let mut forged = binding.clone();
    forged.enclave_key_id = "ta-2".to_string();
    assert!(!service.verify_key_binding(&forged));

    // Expired binding fails.
    clock.advance_secs(3601);
    assert!(!service.verify_key_binding(&binding));
    assert!(service.find_binding("did:aci:agent-1#key-1").is_none());

    assert!(service.revoke_binding(&binding.binding_id));
    assert!(!service.revoke_binding(&binding.binding_id));
}

#[tokio::test]
async fn binding_validity_capped_by_attestation() {
    let (_, service) = service_with(TeeConfig::default());
    let mut attestation = trustzone_attestation();
    attestation.valid_until = Some(NOW + 60);

    let binding = service
        .bind_key_to_enclave("did:aci:agent-1#key-1", &attestation)
        .await
        .unwrap();
    assert_eq!(binding.valid_until, NOW + 60);
}

#[tokio::test]
async fn nitro_requires_boot_pcrs() {
    let (_, service) = service_with(TeeConfig::default());
    let mut attestation = trustzone_attestation();
    attestation.platform = TeePlatform::Nitro;

    let err = service.verify_attestation(&attestation).await.unwrap_err();
    assert_eq!(err.code(), "TEE_ATTESTATION_ERROR");

    attestation.pcrs = [("PCR0", "aa"), ("PCR1", "bb"), ("PCR2", "cc")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert!(service.verify_attestation(&attestation).await.is_ok());
}

#[tokio::test]
async fn sev_snp_report_round_trip() {
    let (_, service) = service_with(TeeConfig::default());
    let mut report = vec![0u8; 1184];
    report[144..192].copy_from_slice(&[0x5a; 48]);

    let attestation = Attestation {
        platform: TeePlatform::SevSnp,
        measurement_hash: "5a".repeat(48),
        enclave_id: "vm-1".to_string(),
        timestamp: NOW,
        pcrs: BTreeMap::new(),
        signature: Some(report),
        certificate_chain: Vec::new(),
        valid_until: None,
    };
    let verified = service.verify_attestation(&attestation).await.unwrap();
    assert_eq!(verified.measurement_hash, "5a".repeat(48));
}

#[tokio::test]
async fn simulated_fallback_marks_result() {
    // Production mode with an unreachable collateral endpoint: the
    // fallback knob downgrades to production_verified = false.
    let config = TeeConfig::builder()
        .production_mode(true)
        .allow_platforms([TeePlatform::Sgx])
        .pccs_url("http://127.0.0.1:1/unreachable")
        .allow_simulated_fallback(true)
        .verification_timeout_secs(1)
        .build()
        .unwrap();
    let (_, service) = service_with(config);

    let verified = service.verify_attestation(&sgx_attestation()).await.unwrap();
    assert!(!verified.production_verified);
}

#[tokio::test]
async fn production_failure_rejects_without_fallback() {
    let config = TeeConfig::builder()
        .production_mode(true)
        .allow_platforms([TeePlatform::Sgx])
        .pccs_url("http://127.0.0.1:1/unreachable")
        .verification_timeout_secs(1)
        .build()
        .unwrap();
    let (_, service) = service_with(config);

    let err = service
        .verify_attestation(&sgx_attestation())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TEE_ATTESTATION_ERROR");
}

#[test]
fn tee_required_tiers() {
    let (_, service) = service_with(TeeConfig::default());
    assert!(!service.is_required(TrustTier::T3));
    assert!(service.is_required(TrustTier::T4));
    assert!(service.is_required(TrustTier::T5));
}
