//! Token TTL arithmetic and refresh recommendations.

use std::sync::Arc;

use aci_core::{Clock, SecurityRequirements, TrustTier, is_high_value_label};
use serde::{Deserialize, Serialize};

use crate::claims::TokenClaims;
use crate::error::TokenError;

/// Token categories with distinct lifetime ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token.
    Access,
    /// Long-lived refresh token.
    Refresh,
    /// OpenID Connect identity token.
    Id,
}

/// Lifetime ceilings and the refresh threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifetimeConfig {
    /// Maximum access-token lifetime in seconds.
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    /// Maximum refresh-token lifetime in seconds.
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    /// Maximum id-token lifetime in seconds.
    #[serde(default = "default_id_ttl_secs")]
    pub id_ttl_secs: u64,
    /// Access-token ceiling for high-value operations.
    #[serde(default = "default_high_value_ttl_secs")]
    pub high_value_ttl_secs: u64,
    /// Refresh once remaining lifetime drops below this fraction of the
    /// total lifetime.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold: f64,
}

fn default_access_ttl_secs() -> u64 {
    300
}

fn default_refresh_ttl_secs() -> u64 {
    86_400
}

fn default_id_ttl_secs() -> u64 {
    300
}

fn default_high_value_ttl_secs() -> u64 {
    60
}

fn default_refresh_threshold() -> f64 {
    0.2
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            id_ttl_secs: default_id_ttl_secs(),
            high_value_ttl_secs: default_high_value_ttl_secs(),
            refresh_threshold: default_refresh_threshold(),
        }
    }
}

impl LifetimeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), TokenError> {
        if !(self.refresh_threshold > 0.0 && self.refresh_threshold < 1.0) {
            return Err(TokenError::Config(
                "refresh_threshold must be strictly between 0 and 1".into(),
            ));
        }
        if self.high_value_ttl_secs > self.access_ttl_secs {
            return Err(TokenError::Config(
                "high_value_ttl_secs must not exceed access_ttl_secs".into(),
            ));
        }
        Ok(())
    }
}

/// Diagnostics from a successful lifetime validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeReport {
    /// Seconds until expiry.
    pub remaining_ttl_secs: u64,
    /// Issued lifetime, `exp - iat`.
    pub total_ttl_secs: u64,
    /// Whether the caller should refresh the token now.
    pub should_refresh: bool,
}

/// Enforces token lifetime ceilings per tier and operation value.
pub struct TokenLifetimeService {
    config: LifetimeConfig,
    clock: Arc<dyn Clock>,
}

impl TokenLifetimeService {
    /// Create a service, validating the configuration.
    pub fn new(config: LifetimeConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        config.validate()?;
        Ok(Self { config, clock })
    }

    /// The service configuration.
    pub fn config(&self) -> &LifetimeConfig {
        &self.config
    }

    /// The configured lifetime ceiling for a token type. High-value
    /// operations collapse the access ceiling to the high-value TTL.
    pub fn get_max_ttl(&self, token_type: TokenType, is_high_value: bool) -> u64 {
        match token_type {
            TokenType::Access if is_high_value => self.config.high_value_ttl_secs,
            TokenType::Access => self.config.access_ttl_secs,
            TokenType::Refresh => self.config.refresh_ttl_secs,
            TokenType::Id => self.config.id_ttl_secs,
        }
    }

    /// The lifetime ceiling for a token under a trust tier's
    /// requirements. Low tiers (T0/T1) allow a longer access lifetime
    /// than the hardened default; the high-value ceiling always wins.
    pub fn get_max_ttl_for_tier(
        &self,
        token_type: TokenType,
        is_high_value: bool,
        tier: TrustTier,
    ) -> u64 {
        match token_type {
            TokenType::Access if is_high_value => self.config.high_value_ttl_secs,
            TokenType::Access => SecurityRequirements::for_tier(tier).max_token_ttl_secs,
            _ => self.get_max_ttl(token_type, is_high_value),
        }
    }

    /// Validate a token's lifetime.
    ///
    /// Rejects missing `exp`/`iat`, expiry, and an issued lifetime above
    /// the ceiling (tier-aware when a tier is supplied). On success
    /// reports remaining lifetime and the refresh recommendation.
    pub fn validate_lifetime(
        &self,
        claims: &TokenClaims,
        token_type: TokenType,
        is_high_value: bool,
        tier: Option<TrustTier>,
    ) -> Result<LifetimeReport, TokenError> {
        let exp = claims.exp.ok_or(TokenError::MissingExp)?;
        let iat = claims.iat.ok_or(TokenError::MissingIat)?;

        let now = self.clock.now_unix_secs();
        if exp <= now {
            return Err(TokenError::Expired { exp, now });
        }

        let total_secs = exp.saturating_sub(iat);
        let max_secs = match tier {
            Some(tier) => self.get_max_ttl_for_tier(token_type, is_high_value, tier),
            None => self.get_max_ttl(token_type, is_high_value),
        };
        if total_secs > max_secs {
            return Err(TokenError::TtlTooLong {
                total_secs,
                max_secs,
            });
        }

        let remaining_ttl_secs = exp - now;
        Ok(LifetimeReport {
            remaining_ttl_secs,
            total_ttl_secs: total_secs,
            should_refresh: self.is_refresh_due(remaining_ttl_secs, total_secs),
        })
    }

    /// Whether a token should be refreshed now.
    pub fn should_refresh(&self, claims: &TokenClaims) -> bool {
        let (Some(exp), Some(iat)) = (claims.exp, claims.iat) else {
            return false;
        };
        let now = self.clock.now_unix_secs();
        if exp <= now {
            return true;
        }
        self.is_refresh_due(exp - now, exp.saturating_sub(iat))
    }

    /// Whether an action requires live introspection: hardened tiers
    /// always do, as do deep action levels and high-value operations.
    pub fn requires_introspection(
        &self,
        action_type: &str,
        action_level: u8,
        tier: TrustTier,
    ) -> bool {
        tier.value() >= 4
            || action_level >= 3
            || self.is_high_value_operation(action_type, action_level)
    }

    /// Whether an action is high-value, by label or by level.
    pub fn is_high_value_operation(&self, action_type: &str, action_level: u8) -> bool {
        action_level >= 3 || is_high_value_label(action_type)
    }

    fn is_refresh_due(&self, remaining_secs: u64, total_secs: u64) -> bool {
        (remaining_secs as f64) <= self.config.refresh_threshold * (total_secs as f64)
    }
}
