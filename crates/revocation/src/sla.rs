//! Per-tier revocation service-level agreements.

use aci_core::TrustTier;
use serde::{Deserialize, Serialize};

/// The staleness bound a tier may rely on for revocation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationSla {
    /// Maximum acceptable propagation latency; doubles as the status
    /// cache TTL for the tier.
    pub max_propagation_latency_ms: u64,
    /// Whether status checks must bypass the cache entirely.
    pub sync_check_required: bool,
    /// Whether the tier also requires live token introspection.
    pub introspection_required: bool,
}

impl RevocationSla {
    /// The default SLA for a trust tier.
    pub fn for_tier(tier: TrustTier) -> Self {
        match tier.value() {
            0 | 1 => Self {
                max_propagation_latency_ms: 60_000,
                sync_check_required: false,
                introspection_required: false,
            },
            2 => Self {
                max_propagation_latency_ms: 30_000,
                sync_check_required: false,
                introspection_required: false,
            },
            3 => Self {
                max_propagation_latency_ms: 10_000,
                sync_check_required: false,
                introspection_required: false,
            },
            _ => Self {
                max_propagation_latency_ms: 1_000,
                sync_check_required: true,
                introspection_required: true,
            },
        }
    }
}
