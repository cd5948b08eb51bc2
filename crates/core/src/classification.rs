//! Data-classification labels and high-value operation matching.

use serde::{Deserialize, Serialize};

/// Classification of the data an action touches.
///
/// Freeform labels map onto these five levels; `personal`, `sensitive`,
/// and `regulated` require a pairwise DID toward the relying party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClassification {
    /// Freely shareable data.
    Public,
    /// Internal business data.
    Business,
    /// Personally identifiable information.
    Personal,
    /// Sensitive personal data (financial, health).
    Sensitive,
    /// Data under a regulatory regime (GDPR, HIPAA).
    Regulated,
}

impl DataClassification {
    /// Map a freeform classification label onto a level.
    ///
    /// Accepts the canonical labels plus their aliases (`pii`,
    /// `financial`, `health`, `phi`, `gdpr`, `hipaa`). Unknown labels
    /// return `None` rather than guessing a level.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "business" => Some(Self::Business),
            "personal" | "pii" => Some(Self::Personal),
            "sensitive" | "financial" | "health" | "phi" => Some(Self::Sensitive),
            "regulated" | "gdpr" | "hipaa" => Some(Self::Regulated),
            _ => None,
        }
    }

    /// Whether this classification requires a pairwise DID.
    pub fn requires_pairwise(self) -> bool {
        matches!(self, Self::Personal | Self::Sensitive | Self::Regulated)
    }
}

impl core::fmt::Display for DataClassification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Business => write!(f, "business"),
            Self::Personal => write!(f, "personal"),
            Self::Sensitive => write!(f, "sensitive"),
            Self::Regulated => write!(f, "regulated"),
        }
    }
}

/// Action labels whose risk profile mandates high-value handling.
const HIGH_VALUE_OPERATIONS: &[&str] = &[
    "financial_transaction",
    "pii_access",
    "external_api_call",
    "data_export",
    "privilege_escalation",
    "delegation_creation",
    "admin_action",
    "security_config_change",
];

/// Whether an action type matches the high-value operation set.
///
/// Matching is case-insensitive equality or substring containment, so
/// `payments.financial_transaction.v2` is high-value.
pub fn is_high_value_label(action_type: &str) -> bool {
    let needle = action_type.to_ascii_lowercase();
    HIGH_VALUE_OPERATIONS
        .iter()
        .any(|label| needle == *label || needle.contains(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_aliases() {
        assert_eq!(
            DataClassification::from_label("pii"),
            Some(DataClassification::Personal)
        );
        assert_eq!(
            DataClassification::from_label("PHI"),
            Some(DataClassification::Sensitive)
        );
        assert_eq!(
            DataClassification::from_label("hipaa"),
            Some(DataClassification::Regulated)
        );
        assert_eq!(DataClassification::from_label("unknown"), None);
    }

    #[test]
    fn test_pairwise_requirement_boundary() {
        assert!(!DataClassification::Public.requires_pairwise());
        assert!(!DataClassification::Business.requires_pairwise());
        assert!(DataClassification::Personal.requires_pairwise());
        assert!(DataClassification::Sensitive.requires_pairwise());
        assert!(DataClassification::Regulated.requires_pairwise());
    }

    #[test]
    fn test_high_value_matching() {
        assert!(is_high_value_label("financial_transaction"));
        assert!(is_high_value_label("FINANCIAL_TRANSACTION"));
        assert!(is_high_value_label("payments.financial_transaction.v2"));
        assert!(is_high_value_label("admin_action"));
        assert!(!is_high_value_label("read_profile"));
    }
}
