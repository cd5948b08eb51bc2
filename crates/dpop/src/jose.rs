//! JOSE plumbing for DPoP proofs.
//!
//! Compact JWS assembly, EC JWK encoding, RFC 7638 thumbprints, and
//! ECDSA sign/verify dispatch over the three NIST curves. Signatures use
//! the fixed-width `r || s` encoding JWS requires.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DpopError;

/// ECDSA algorithms accepted for DPoP proofs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DpopAlgorithm {
    /// ECDSA over P-256 with SHA-256.
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA over P-384 with SHA-384.
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA over P-521 with SHA-512.
    #[serde(rename = "ES512")]
    Es512,
}

impl DpopAlgorithm {
    /// The JOSE `alg` header value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// The JWK `crv` member for this algorithm.
    pub fn curve(self) -> &'static str {
        match self {
            Self::Es256 => "P-256",
            Self::Es384 => "P-384",
            Self::Es512 => "P-521",
        }
    }

    /// Byte length of one affine coordinate on this curve.
    pub fn coordinate_len(self) -> usize {
        match self {
            Self::Es256 => 32,
            Self::Es384 => 48,
            Self::Es512 => 66,
        }
    }

    /// Parse a JOSE `alg` header value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ES256" => Some(Self::Es256),
            "ES384" => Some(Self::Es384),
            "ES512" => Some(Self::Es512),
            _ => None,
        }
    }
}

impl core::fmt::Display for DpopAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A public elliptic-curve JWK as embedded in a DPoP proof header.
///
/// The private component `d` is never populated by this crate; its
/// presence in a received proof is rejected during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcJwk {
    /// Key type; always `EC` here.
    pub kty: String,
    /// Curve name (`P-256`, `P-384`, `P-521`).
    pub crv: String,
    /// Base64url-encoded affine x coordinate.
    pub x: String,
    /// Base64url-encoded affine y coordinate.
    pub y: String,
    /// Private component. Must be absent in transmitted proofs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl EcJwk {
    /// Compute the RFC 7638 thumbprint: SHA-256 over the canonical JSON
    /// of the required EC members (`crv`, `kty`, `x`, `y` in
    /// lexicographic order), base64url-encoded.
    pub fn thumbprint(&self) -> String {
        let canonical = format!(
            "{{\"crv\":\"{}\",\"kty\":\"{}\",\"x\":\"{}\",\"y\":\"{}\"}}",
            self.crv, self.kty, self.x, self.y
        );
        URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
    }

    /// The algorithm implied by the `crv` member.
    pub fn algorithm(&self) -> Option<DpopAlgorithm> {
        match self.crv.as_str() {
            "P-256" => Some(DpopAlgorithm::Es256),
            "P-384" => Some(DpopAlgorithm::Es384),
            "P-521" => Some(DpopAlgorithm::Es512),
            _ => None,
        }
    }

    fn coordinates(&self, alg: DpopAlgorithm) -> Result<(Vec<u8>, Vec<u8>), DpopError> {
        let x = decode_b64url(&self.x)?;
        let y = decode_b64url(&self.y)?;
        if x.len() != alg.coordinate_len() || y.len() != alg.coordinate_len() {
            return Err(DpopError::InvalidFormat(format!(
                "jwk coordinate length invalid for {}",
                alg.curve()
            )));
        }
        Ok((x, y))
    }
}

enum KeyInner {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
}

/// An in-memory ECDSA key pair for producing DPoP proofs.
///
/// The private half never leaves this type; only the public JWK is
/// exposed for embedding in proof headers.
pub struct DpopKeyPair {
    alg: DpopAlgorithm,
    inner: KeyInner,
}

impl DpopKeyPair {
    /// Generate a fresh random key pair for the given algorithm.
    pub fn generate(alg: DpopAlgorithm) -> Self {
        let mut rng = rand::rngs::OsRng;
        let inner = match alg {
            DpopAlgorithm::Es256 => KeyInner::P256(p256::ecdsa::SigningKey::random(&mut rng)),
            DpopAlgorithm::Es384 => KeyInner::P384(p384::ecdsa::SigningKey::random(&mut rng)),
            DpopAlgorithm::Es512 => KeyInner::P521(p521::ecdsa::SigningKey::random(&mut rng)),
        };
        Self { alg, inner }
    }

    /// The key's algorithm.
    pub fn algorithm(&self) -> DpopAlgorithm {
        self.alg
    }

    /// The public half as a JWK, suitable for a proof header.
    pub fn public_jwk(&self) -> EcJwk {
        let (x, y) = match &self.inner {
            KeyInner::P256(key) => {
                use p256::elliptic_curve::sec1::ToEncodedPoint;
                let point = key.verifying_key().to_encoded_point(false);
                (
                    point.x().expect("uncompressed point").to_vec(),
                    point.y().expect("uncompressed point").to_vec(),
                )
            }
            KeyInner::P384(key) => {
                use p384::elliptic_curve::sec1::ToEncodedPoint;
                let point = key.verifying_key().to_encoded_point(false);
                (
                    point.x().expect("uncompressed point").to_vec(),
                    point.y().expect("uncompressed point").to_vec(),
                )
            }
            KeyInner::P521(key) => {
                use p521::elliptic_curve::sec1::ToEncodedPoint;
                let point = p521::ecdsa::VerifyingKey::from(key).to_encoded_point(false);
                (
                    point.x().expect("uncompressed point").to_vec(),
                    point.y().expect("uncompressed point").to_vec(),
                )
            }
        };
        EcJwk {
            kty: "EC".to_string(),
            crv: self.alg.curve().to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
            d: None,
        }
    }

    /// The RFC 7638 thumbprint of the public key.
    pub fn thumbprint(&self) -> String {
        self.public_jwk().thumbprint()
    }

    /// Sign a JWS signing input, returning the fixed-width `r || s`
    /// signature bytes.
    pub(crate) fn sign(&self, signing_input: &[u8]) -> Vec<u8> {
        match &self.inner {
            KeyInner::P256(key) => {
                let sig: p256::ecdsa::Signature = key.sign(signing_input);
                sig.to_bytes().to_vec()
            }
            KeyInner::P384(key) => {
                let sig: p384::ecdsa::Signature = key.sign(signing_input);
                sig.to_bytes().to_vec()
            }
            KeyInner::P521(key) => {
                let sig: p521::ecdsa::Signature = key.sign(signing_input);
                sig.to_bytes().to_vec()
            }
        }
    }
}

impl core::fmt::Debug for DpopKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never expose key material through Debug output.
        f.debug_struct("DpopKeyPair")
            .field("alg", &self.alg)
            .field("thumbprint", &self.thumbprint())
            .finish()
    }
}

/// Verify an ECDSA signature over a JWS signing input using the public
/// key from a proof header.
pub(crate) fn verify_signature(
    jwk: &EcJwk,
    alg: DpopAlgorithm,
    signing_input: &[u8],
    signature: &[u8],
) -> Result<(), DpopError> {
    let (x, y) = jwk.coordinates(alg)?;
    let ok = match alg {
        DpopAlgorithm::Es256 => {
            let point = p256::EncodedPoint::from_affine_coordinates(
                p256::FieldBytes::from_slice(&x),
                p256::FieldBytes::from_slice(&y),
                false,
            );
            let key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| DpopError::InvalidFormat("jwk is not a valid P-256 point".into()))?;
            let sig = p256::ecdsa::Signature::from_slice(signature)
                .map_err(|_| DpopError::InvalidSignature)?;
            key.verify(signing_input, &sig).is_ok()
        }
        DpopAlgorithm::Es384 => {
            let point = p384::EncodedPoint::from_affine_coordinates(
                p384::FieldBytes::from_slice(&x),
                p384::FieldBytes::from_slice(&y),
                false,
            );
            let key = p384::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| DpopError::InvalidFormat("jwk is not a valid P-384 point".into()))?;
            let sig = p384::ecdsa::Signature::from_slice(signature)
                .map_err(|_| DpopError::InvalidSignature)?;
            key.verify(signing_input, &sig).is_ok()
        }
        DpopAlgorithm::Es512 => {
            let point = p521::EncodedPoint::from_affine_coordinates(
                p521::FieldBytes::from_slice(&x),
                p521::FieldBytes::from_slice(&y),
                false,
            );
            let key = p521::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| DpopError::InvalidFormat("jwk is not a valid P-521 point".into()))?;
            let sig = p521::ecdsa::Signature::from_slice(signature)
                .map_err(|_| DpopError::InvalidSignature)?;
            key.verify(signing_input, &sig).is_ok()
        }
    };
    if ok { Ok(()) } else { Err(DpopError::InvalidSignature) }
}

/// Base64url-encode without padding.
pub(crate) fn encode_b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Base64url-decode without padding.
pub(crate) fn decode_b64url(value: &str) -> Result<Vec<u8>, DpopError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| DpopError::InvalidFormat(format!("invalid base64url: {e}")))
}

/// Base64url SHA-256 of an access token, as carried in the `ath` claim.
pub fn access_token_hash(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}
