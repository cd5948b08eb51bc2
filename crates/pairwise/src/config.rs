//! Pairwise DID service configuration.

use serde::{Deserialize, Serialize};

use crate::derivation::DerivationAlgorithm;
use crate::error::PairwiseError;

/// Configuration for [`PairwiseDidService`](crate::PairwiseDidService).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseConfig {
    /// Which derivation algorithm to use.
    #[serde(default)]
    pub algorithm: DerivationAlgorithm,
    /// HKDF info string, versioned so a rotation produces new
    /// identifiers.
    #[serde(default = "default_hkdf_info")]
    pub hkdf_info: String,
    /// Length of generated salts in bytes before base64url encoding.
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,
}

fn default_hkdf_info() -> String {
    "aci-pairwise-did-v1".to_string()
}

fn default_salt_length() -> usize {
    32
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            algorithm: DerivationAlgorithm::default(),
            hkdf_info: default_hkdf_info(),
            salt_length: default_salt_length(),
        }
    }
}

impl PairwiseConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PairwiseError> {
        if self.salt_length < 16 {
            return Err(PairwiseError::Config(
                "salt_length below 16 bytes gives too little entropy".into(),
            ));
        }
        if self.hkdf_info.is_empty() {
            return Err(PairwiseError::Config("hkdf_info must be non-empty".into()));
        }
        Ok(())
    }
}
