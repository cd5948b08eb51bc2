//! DPoP proof generation and verification.

use std::sync::Arc;

use aci_core::{Clock, TrustTier};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::DpopConfig;
use crate::error::DpopError;
use crate::jose::{
    DpopAlgorithm, DpopKeyPair, EcJwk, decode_b64url, encode_b64url, verify_signature,
};
use crate::replay::JtiCache;

const DPOP_TYP: &str = "dpop+jwt";

#[derive(Debug, Serialize, Deserialize)]
struct ProofHeader {
    typ: String,
    alg: String,
    jwk: EcJwk,
}

/// The claims of a DPoP proof payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofClaims {
    /// Unique proof identifier.
    pub jti: String,
    /// Uppercased HTTP method the proof covers.
    pub htm: String,
    /// Absolute request URI the proof covers.
    pub htu: String,
    /// Issued-at, Unix seconds.
    pub iat: u64,
    /// Base64url SHA-256 of the access token, when token-bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ath: Option<String>,
}

/// Outcome of a successful proof verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedProof {
    /// RFC 7638 thumbprint of the proof's public key.
    pub thumbprint: String,
    /// The proof's unique identifier, now recorded in the replay cache.
    pub jti: String,
    /// The proof's issued-at, Unix seconds.
    pub iat: u64,
}

/// DPoP proof-of-possession service.
///
/// Generates proofs for outbound requests and verifies inbound proofs
/// against the request method/URI, the replay cache, and (optionally)
/// the access token they are bound to.
pub struct DpopService {
    config: DpopConfig,
    jti_cache: Arc<dyn JtiCache>,
    clock: Arc<dyn Clock>,
}

impl DpopService {
    /// Create a new service over a replay cache and clock.
    pub fn new(config: DpopConfig, jti_cache: Arc<dyn JtiCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            jti_cache,
            clock,
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &DpopConfig {
        &self.config
    }

    /// Whether DPoP is mandatory for the given trust tier.
    pub fn is_required(&self, tier: TrustTier) -> bool {
        self.config.required_for_tiers.contains(&tier.value())
    }

    /// Generate a signed proof for a request.
    ///
    /// The embedded JWK is the public half of `key`; the private
    /// component is never serialized. `ath` binds the proof to an access
    /// token and should be [`access_token_hash`](crate::access_token_hash)
    /// of the token.
    pub fn generate_proof(
        &self,
        key: &DpopKeyPair,
        method: &str,
        uri: &str,
        ath: Option<String>,
    ) -> Result<String, DpopError> {
        let alg = key.algorithm();
        if !self.config.allowed_algorithms.contains(&alg) {
            return Err(DpopError::InvalidFormat(format!(
                "algorithm {alg} is not allowed"
            )));
        }

        let header = ProofHeader {
            typ: DPOP_TYP.to_string(),
            alg: alg.name().to_string(),
            jwk: key.public_jwk(),
        };
        let claims = ProofClaims {
            jti: Uuid::new_v4().to_string(),
            htm: method.to_ascii_uppercase(),
            htu: uri.to_string(),
            iat: self.clock.now_unix_secs(),
            ath,
        };

        let header_b64 = encode_b64url(&serde_json::to_vec(&header).map_err(json_err)?);
        let claims_b64 = encode_b64url(&serde_json::to_vec(&claims).map_err(json_err)?);
        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = key.sign(signing_input.as_bytes());

        Ok(format!("{signing_input}.{}", encode_b64url(&signature)))
    }

    /// Verify a proof against the expected method, URI, and (optionally)
    /// access-token hash.
    ///
    /// Checks run in a fixed order, each with a dedicated error code; on
    /// success the proof's `jti` is recorded in the replay cache until
    /// `iat + max_proof_age`.
    pub fn verify_proof(
        &self,
        proof: &str,
        expected_method: &str,
        expected_uri: &str,
        expected_ath: Option<&str>,
    ) -> Result<VerifiedProof, DpopError> {
        let (header_b64, claims_b64, signature_b64) = split_compact(proof)?;

        let header: ProofHeader = serde_json::from_slice(&decode_b64url(header_b64)?)
            .map_err(|e| DpopError::InvalidFormat(format!("invalid proof header: {e}")))?;

        if header.typ != DPOP_TYP {
            return Err(DpopError::InvalidFormat(format!(
                "typ must be {DPOP_TYP}, got {}",
                header.typ
            )));
        }

        let alg = DpopAlgorithm::from_name(&header.alg)
            .filter(|alg| self.config.allowed_algorithms.contains(alg))
            .ok_or_else(|| {
                DpopError::InvalidFormat(format!("algorithm {} is not allowed", header.alg))
            })?;

        if header.jwk.kty != "EC" {
            return Err(DpopError::InvalidFormat(format!(
                "jwk kty must be EC, got {}",
                header.jwk.kty
            )));
        }
        if header.jwk.d.is_some() {
            return Err(DpopError::InvalidFormat(
                "jwk carries a private key component".into(),
            ));
        }
        if header.jwk.algorithm() != Some(alg) {
            return Err(DpopError::InvalidFormat(format!(
                "jwk curve {} does not match alg {}",
                header.jwk.crv, header.alg
            )));
        }

        let claims: ProofClaims = serde_json::from_slice(&decode_b64url(claims_b64)?)
            .map_err(|e| DpopError::InvalidFormat(format!("invalid proof claims: {e}")))?;

        if self.jti_cache.exists(&claims.jti) {
            return Err(DpopError::Replay(claims.jti));
        }

        let now = self.clock.now_unix_secs();
        let skew = self.config.clock_skew_secs;
        if claims
            .iat
            .saturating_add(self.config.max_proof_age_secs)
            .saturating_add(skew)
            < now
        {
            return Err(DpopError::Expired {
                iat: claims.iat,
                max_proof_age_secs: self.config.max_proof_age_secs,
            });
        }
        if claims.iat > now + skew {
            return Err(DpopError::InvalidFormat(format!(
                "proof is future-dated: iat={}, now={now}",
                claims.iat
            )));
        }

        if !claims.htm.eq_ignore_ascii_case(expected_method) {
            return Err(DpopError::MethodMismatch {
                expected: expected_method.to_ascii_uppercase(),
                actual: claims.htm,
            });
        }

        // Byte-exact comparison; callers normalize the URI.
        if claims.htu != expected_uri {
            return Err(DpopError::UriMismatch {
                expected: expected_uri.to_string(),
                actual: claims.htu,
            });
        }

        if let Some(expected) = expected_ath {
            let matches = claims
                .ath
                .as_deref()
                .is_some_and(|ath| bool::from(ath.as_bytes().ct_eq(expected.as_bytes())));
            if !matches {
                return Err(DpopError::InvalidFormat(
                    "ath does not match the presented access token".into(),
                ));
            }
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = decode_b64url(signature_b64)?;
        verify_signature(&header.jwk, alg, signing_input.as_bytes(), &signature)?;

        let expires_at_millis = claims
            .iat
            .saturating_add(self.config.max_proof_age_secs)
            .saturating_mul(1000);
        if !self.jti_cache.insert_if_absent(&claims.jti, expires_at_millis) {
            // A concurrent verification of the same proof won the race.
            return Err(DpopError::Replay(claims.jti));
        }

        tracing::debug!(jti = %claims.jti, alg = %alg, "dpop proof verified");

        Ok(VerifiedProof {
            thumbprint: header.jwk.thumbprint(),
            jti: claims.jti,
            iat: claims.iat,
        })
    }

    /// Verify a token-bound proof.
    ///
    /// The proof must carry `ath = base64url(sha256(token))`, and when
    /// the token's `cnf.jkt` confirmation is present the proof key's
    /// thumbprint must equal it.
    pub fn validate_bound_token(
        &self,
        token: &str,
        proof: &str,
        method: &str,
        uri: &str,
        token_jkt: Option<&str>,
    ) -> Result<VerifiedProof, DpopError> {
        let expected_ath = crate::jose::access_token_hash(token);
        let verified = self.verify_proof(proof, method, uri, Some(&expected_ath))?;

        if let Some(jkt) = token_jkt {
            if verified.thumbprint != jkt {
                return Err(DpopError::InvalidFormat(
                    "proof key does not match the token cnf.jkt confirmation".into(),
                ));
            }
        }

        Ok(verified)
    }
}

fn split_compact(proof: &str) -> Result<(&str, &str, &str), DpopError> {
    let mut parts = proof.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) if !h.is_empty() && !c.is_empty() && !s.is_empty() => {
            Ok((h, c, s))
        }
        _ => Err(DpopError::InvalidFormat(
            "proof is not a three-part compact JWS".into(),
        )),
    }
}

fn json_err(e: serde_json::Error) -> DpopError {
    DpopError::InvalidFormat(format!("serialization failed: {e}"))
}
