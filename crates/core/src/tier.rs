//! Trust tiers, conformance levels, and the per-tier requirement table.

use serde::{Deserialize, Serialize};

/// An agent's trust tier.
///
/// Tiers are a monotone scale from 0 (untrusted) to 5 (maximally
/// hardened). The tier itself is assigned by an external policy engine;
/// this crate only maps a tier to the security requirements it implies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TrustTier(u8);

/// Errors from trust-tier construction.
#[derive(Debug, thiserror::Error)]
pub enum TierError {
    /// Tier value outside the 0–5 range.
    #[error("trust tier out of range: {0} (expected 0-5)")]
    OutOfRange(u8),
}

impl TrustTier {
    /// Tier 0: unverified agent.
    pub const T0: Self = Self(0);
    /// Tier 1: registered agent.
    pub const T1: Self = Self(1);
    /// Tier 2: verified agent.
    pub const T2: Self = Self(2);
    /// Tier 3: attested identity.
    pub const T3: Self = Self(3);
    /// Tier 4: hardware-backed agent.
    pub const T4: Self = Self(4);
    /// Tier 5: maximally hardened agent.
    pub const T5: Self = Self(5);

    /// Construct a tier, rejecting values above 5.
    pub fn new(tier: u8) -> Result<Self, TierError> {
        if tier > 5 {
            return Err(TierError::OutOfRange(tier));
        }
        Ok(Self(tier))
    }

    /// The raw tier value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// The conformance level this tier maps to.
    pub fn conformance_level(self) -> ConformanceLevel {
        match self.0 {
            0 | 1 => ConformanceLevel::None,
            2 => ConformanceLevel::Sh1Basic,
            3 => ConformanceLevel::Sh2Standard,
            _ => ConformanceLevel::Sh3Hardened,
        }
    }
}

impl core::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Security-hardening conformance level, derived from the trust tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConformanceLevel {
    /// No hardening requirements.
    #[serde(rename = "none")]
    None,
    /// SH1: proof-of-possession on every request.
    #[serde(rename = "sh1-basic")]
    Sh1Basic,
    /// SH2: SH1 plus pairwise identifiers.
    #[serde(rename = "sh2-standard")]
    Sh2Standard,
    /// SH3: SH2 plus hardware attestation and synchronous revocation.
    #[serde(rename = "sh3-hardened")]
    Sh3Hardened,
}

impl core::fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Sh1Basic => write!(f, "sh1-basic"),
            Self::Sh2Standard => write!(f, "sh2-standard"),
            Self::Sh3Hardened => write!(f, "sh3-hardened"),
        }
    }
}

/// The security requirements a trust tier implies.
///
/// Derived deterministically from the tier; the boolean axes are
/// non-decreasing in tier and `max_token_ttl_secs` is non-increasing
/// above tier 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRequirements {
    /// The tier these requirements were derived from.
    pub tier: TrustTier,
    /// DPoP proof required on every request.
    pub dpop_required: bool,
    /// Hardware attestation binding required.
    pub tee_required: bool,
    /// Pairwise DIDs required toward relying parties.
    pub pairwise_required: bool,
    /// Revocation checks must bypass the cache.
    pub sync_revocation_required: bool,
    /// Maximum acceptable access-token lifetime, in seconds.
    pub max_token_ttl_secs: u64,
    /// Maximum delegation chain depth.
    pub max_chain_depth: u32,
}

impl SecurityRequirements {
    /// Resolve the requirement vector for a tier.
    pub fn for_tier(tier: TrustTier) -> Self {
        let t = tier.value();
        Self {
            tier,
            dpop_required: t >= 2,
            tee_required: t >= 4,
            pairwise_required: t >= 3,
            sync_revocation_required: t >= 4,
            max_token_ttl_secs: if t >= 2 { 300 } else { 3600 },
            max_chain_depth: match t {
                0 | 1 => 1,
                2 => 2,
                3 => 3,
                _ => 5,
            },
        }
    }

    /// The conformance level enforced alongside these requirements.
    pub fn conformance_level(&self) -> ConformanceLevel {
        self.tier.conformance_level()
    }
}
