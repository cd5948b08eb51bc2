//! The pairwise DID service: derivation plus the relationship registry.

use std::sync::Arc;

use aci_core::{Clock, DataClassification};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::PairwiseConfig;
use crate::derivation::{derive_material, material_to_did_key};
use crate::error::PairwiseError;

/// A recorded pairwise relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationRecord {
    /// The agent's master DID.
    pub master_did: String,
    /// The relying party the derived DID is scoped to.
    pub relying_party_did: String,
    /// Salt used for this relationship.
    pub context_salt: String,
    /// The derived pairwise DID.
    pub derived_did: String,
    /// Unix seconds when the relationship was first derived.
    pub created_at: u64,
}

/// Outcome of a pairwise requirement lookup for a freeform label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairwiseRequirement {
    /// Whether a pairwise DID is required.
    pub required: bool,
    /// The classification the label mapped onto, if recognized.
    pub classification: Option<DataClassification>,
}

/// Derives relationship-scoped DIDs so a master DID cannot be
/// correlated across relying parties.
pub struct PairwiseDidService {
    config: PairwiseConfig,
    registry: DashMap<(String, String), DerivationRecord>,
    clock: Arc<dyn Clock>,
}

impl PairwiseDidService {
    /// Create a service, validating the configuration.
    pub fn new(config: PairwiseConfig, clock: Arc<dyn Clock>) -> Result<Self, PairwiseError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: DashMap::new(),
            clock,
        })
    }

    /// The service configuration.
    pub fn config(&self) -> &PairwiseConfig {
        &self.config
    }

    /// Derive (or recall) the pairwise DID for a relationship.
    ///
    /// The first call for a `(master, relying party)` pair derives and
    /// records the DID; subsequent calls return the recorded value
    /// without re-deriving, regardless of the salt argument.
    pub fn derive_pairwise_did(
        &self,
        master_did: &str,
        relying_party_did: &str,
        salt: Option<&str>,
    ) -> Result<String, PairwiseError> {
        let key = (master_did.to_string(), relying_party_did.to_string());
        if let Some(record) = self.registry.get(&key) {
            return Ok(record.derived_did.clone());
        }

        let context_salt = match salt {
            Some(s) => s.to_string(),
            None => self.generate_salt(),
        };
        let material = derive_material(
            self.config.algorithm,
            master_did,
            relying_party_did,
            &context_salt,
            &self.config.hkdf_info,
        )?;
        let derived_did = material_to_did_key(&material);

        let record = DerivationRecord {
            master_did: master_did.to_string(),
            relying_party_did: relying_party_did.to_string(),
            context_salt,
            derived_did: derived_did.clone(),
            created_at: self.clock.now_unix_secs(),
        };
        // Concurrent derivations of the same pair converge: outputs are
        // equal for equal salts, and the registry keeps whichever record
        // landed, which later calls return verbatim.
        let entry = self.registry.entry(key).or_insert(record);
        let derived = entry.derived_did.clone();
        drop(entry);

        tracing::debug!(
            master_did = %master_did,
            relying_party_did = %relying_party_did,
            "derived pairwise did"
        );
        Ok(derived)
    }

    /// Validate a pairwise DID by re-deriving it from its inputs.
    pub fn validate_pairwise_did(
        &self,
        pairwise_did: &str,
        master_did: &str,
        relying_party_did: &str,
        salt: &str,
    ) -> bool {
        derive_material(
            self.config.algorithm,
            master_did,
            relying_party_did,
            salt,
            &self.config.hkdf_info,
        )
        .map(|material| material_to_did_key(&material) == pairwise_did)
        .unwrap_or(false)
    }

    /// Generate a random salt of the configured length, base64url.
    pub fn generate_salt(&self) -> String {
        let mut bytes = vec![0u8; self.config.salt_length];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Whether a data classification requires a pairwise DID.
    pub fn is_required(&self, classification: DataClassification) -> bool {
        classification.requires_pairwise()
    }

    /// Resolve the pairwise requirement for a freeform label.
    ///
    /// Unrecognized labels are not required; the caller decides whether
    /// to treat that as a policy warning.
    pub fn get_requirement(&self, label: &str) -> PairwiseRequirement {
        let classification = DataClassification::from_label(label);
        PairwiseRequirement {
            required: classification.is_some_and(DataClassification::requires_pairwise),
            classification,
        }
    }

    /// The recorded relationship for a pair, if any.
    pub fn get_relationship(
        &self,
        master_did: &str,
        relying_party_did: &str,
    ) -> Option<DerivationRecord> {
        self.registry
            .get(&(master_did.to_string(), relying_party_did.to_string()))
            .map(|record| record.clone())
    }

    /// Remove a recorded relationship. Returns `true` if one existed.
    pub fn revoke_relationship(&self, master_did: &str, relying_party_did: &str) -> bool {
        self.registry
            .remove(&(master_did.to_string(), relying_party_did.to_string()))
            .is_some()
    }

    /// All recorded relationships for a master DID.
    pub fn list_derivations(&self, master_did: &str) -> Vec<DerivationRecord> {
        self.registry
            .iter()
            .filter(|entry| entry.key().0 == master_did)
            .map(|entry| entry.value().clone())
            .collect()
    }
}
