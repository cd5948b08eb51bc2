//! Deterministic pairwise identifier derivation.

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PairwiseError;

// did:key rendering: ed25519 multicodec prefix, then the 32 derived
// bytes, base58btc with the multibase 'z' prefix.
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];
const OUTPUT_LEN: usize = 32;

/// Key-derivation algorithm for pairwise DIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DerivationAlgorithm {
    /// HKDF-SHA256 (RFC 5869), extract-then-expand.
    #[default]
    Hkdf,
    /// Single SHA-256 over the concatenated inputs.
    Sha256,
}

/// Derive the 32 bytes of pairwise key material.
///
/// Deterministic: fixed `(master, relying_party, salt, algorithm, info)`
/// always yields the same output.
pub fn derive_material(
    algorithm: DerivationAlgorithm,
    master_did: &str,
    relying_party_did: &str,
    salt: &str,
    hkdf_info: &str,
) -> Result<[u8; OUTPUT_LEN], PairwiseError> {
    if master_did.is_empty() || relying_party_did.is_empty() {
        return Err(PairwiseError::Derivation(
            "master and relying-party DIDs must be non-empty".into(),
        ));
    }

    match algorithm {
        DerivationAlgorithm::Hkdf => {
            let ikm = format!("{master_did}:{relying_party_did}");
            let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), ikm.as_bytes());
            let mut okm = [0u8; OUTPUT_LEN];
            hk.expand(hkdf_info.as_bytes(), &mut okm)
                .map_err(|e| PairwiseError::Derivation(format!("hkdf expand failed: {e}")))?;
            Ok(okm)
        }
        DerivationAlgorithm::Sha256 => {
            let input = format!("{master_did}:{relying_party_did}:{salt}");
            Ok(Sha256::digest(input.as_bytes()).into())
        }
    }
}

/// Render derived key material as a `did:key` identifier.
pub fn material_to_did_key(material: &[u8; OUTPUT_LEN]) -> String {
    let mut prefixed = Vec::with_capacity(ED25519_MULTICODEC.len() + OUTPUT_LEN);
    prefixed.extend_from_slice(&ED25519_MULTICODEC);
    prefixed.extend_from_slice(material);
    format!("did:key:z{}", bs58::encode(prefixed).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "did:aci:agent-42";
    const RP: &str = "did:web:api.example.com";
    const SALT: &str = "Zm9vYmFyYmF6";
    const INFO: &str = "aci-pairwise-did-v1";

    #[test]
    fn test_hkdf_deterministic() {
        let a = derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, SALT, INFO).unwrap();
        let b = derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, SALT, INFO).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inputs_change_output() {
        let base = derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, SALT, INFO).unwrap();
        let other_rp =
            derive_material(DerivationAlgorithm::Hkdf, MASTER, "did:web:other", SALT, INFO)
                .unwrap();
        let other_salt =
            derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, "b3RoZXI", INFO).unwrap();
        let other_info =
            derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, SALT, "v2").unwrap();
        assert_ne!(base, other_rp);
        assert_ne!(base, other_salt);
        assert_ne!(base, other_info);
    }

    #[test]
    fn test_algorithms_differ() {
        let hkdf = derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, SALT, INFO).unwrap();
        let sha = derive_material(DerivationAlgorithm::Sha256, MASTER, RP, SALT, INFO).unwrap();
        assert_ne!(hkdf, sha);
    }

    #[test]
    fn test_did_key_rendering() {
        let material = derive_material(DerivationAlgorithm::Hkdf, MASTER, RP, SALT, INFO).unwrap();
        let did = material_to_did_key(&material);
        assert!(did.starts_with("did:key:z"));
        // base58btc alphabet excludes 0, O, I, l.
        let encoded = &did["did:key:z".len()..];
        assert!(encoded.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert!(!encoded.contains(['0', 'O', 'I', 'l']));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = derive_material(DerivationAlgorithm::Hkdf, "", RP, SALT, INFO).unwrap_err();
        assert!(matches!(err, PairwiseError::Derivation(_)));
    }
}
