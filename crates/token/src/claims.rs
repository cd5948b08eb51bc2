//! Token claim shapes and the unverified JWT claims peek.
//!
//! Lifetime checks only need `exp`/`iat` and the `cnf` confirmation; the
//! issuer's signature is not verified here (the token issuer and its
//! keys live outside this subsystem, and introspection is the live
//! source of truth for validity).

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// RFC 7800 confirmation claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Confirmation {
    /// JWK SHA-256 thumbprint the token is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jkt: Option<String>,
}

/// The subset of JWT claims the lifetime checks read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenClaims {
    /// Subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry, Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Issued-at, Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Proof-of-possession confirmation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnf: Option<Confirmation>,
}

impl TokenClaims {
    /// The `cnf.jkt` thumbprint, if the token is key-bound.
    pub fn jkt(&self) -> Option<&str> {
        self.cnf.as_ref().and_then(|cnf| cnf.jkt.as_deref())
    }
}

/// Decode the claims of a compact JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(TokenError::Malformed(
                "token is not a three-part compact JWT".into(),
            ));
        }
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("payload is not valid claims JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_jwt(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_exp_iat_cnf() {
        let token = encode_jwt(&serde_json::json!({
            "sub": "did:aci:agent-1",
            "exp": 1_700_000_300u64,
            "iat": 1_700_000_000u64,
            "cnf": { "jkt": "thumb" },
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(1_700_000_300));
        assert_eq!(claims.iat, Some(1_700_000_000));
        assert_eq!(claims.jkt(), Some("thumb"));
    }

    #[test]
    fn test_opaque_token_rejected() {
        let err = decode_claims("opaque-token").unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn test_unknown_claims_ignored() {
        let token = encode_jwt(&serde_json::json!({
            "exp": 10u64, "iat": 5u64, "scope": "read write", "aud": "x",
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(10));
        assert!(claims.cnf.is_none());
    }
}
