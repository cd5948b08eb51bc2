//! RFC 7662 token introspection client with a TTL cache.

use std::sync::Arc;
use std::time::Duration;

use aci_core::Clock;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use url::Url;

use crate::claims::Confirmation;
use crate::error::IntrospectionError;

/// Configuration for [`IntrospectionClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionConfig {
    /// The introspection endpoint URL.
    pub endpoint_url: String,
    /// Client id for HTTP basic auth, if the endpoint requires it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Client secret paired with `client_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Per-call deadline in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Default acceptable cache age when the caller does not supply one.
    #[serde(default = "default_cache_max_age_ms")]
    pub default_cache_max_age_ms: u64,
    /// Upper bound on any caller-supplied cache age.
    #[serde(default = "default_max_cache_ttl_ms")]
    pub max_cache_ttl_ms: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_cache_max_age_ms() -> u64 {
    30_000
}

fn default_max_cache_ttl_ms() -> u64 {
    60_000
}

impl IntrospectionConfig {
    /// Create a config for an endpoint with the defaults.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            client_id: None,
            client_secret: None,
            timeout_secs: default_timeout_secs(),
            default_cache_max_age_ms: default_cache_max_age_ms(),
            max_cache_ttl_ms: default_max_cache_ttl_ms(),
        }
    }

    /// Set basic-auth client credentials.
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), IntrospectionError> {
        Url::parse(&self.endpoint_url).map_err(|e| {
            IntrospectionError::Config(format!("endpoint_url is not a valid url: {e}"))
        })?;
        if self.client_secret.is_some() && self.client_id.is_none() {
            return Err(IntrospectionError::Config(
                "client_secret requires a client_id".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(IntrospectionError::Config("timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// An RFC 7662 introspection response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResult {
    /// Whether the token is currently active.
    pub active: bool,
    /// Space-separated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the token was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Human-readable resource-owner identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Token type (e.g. `Bearer`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry, Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Issued-at, Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Proof-of-possession confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnf: Option<Confirmation>,
}

/// An introspection result plus cache provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectionOutcome {
    /// The introspection result.
    pub result: IntrospectionResult,
    /// Whether this result came from the cache.
    pub from_cache: bool,
    /// When the underlying result was obtained (Unix milliseconds).
    pub cached_at_millis: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: IntrospectionResult,
    cached_at_millis: u64,
}

/// RFC 7662 client. Tokens are cached under a SHA-256 digest so raw
/// token bytes never sit in the cache keys.
pub struct IntrospectionClient {
    config: IntrospectionConfig,
    http: reqwest::Client,
    cache: Arc<DashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    sweeper_shutdown: Arc<Notify>,
    sweeper_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl IntrospectionClient {
    /// Create a client, validating the configuration.
    pub fn new(
        config: IntrospectionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IntrospectionError> {
        config.validate()?;
        Ok(Self {
            config,
            http: reqwest::Client::new(),
            cache: Arc::new(DashMap::new()),
            clock,
            sweeper_shutdown: Arc::new(Notify::new()),
            sweeper_task: std::sync::Mutex::new(None),
        })
    }

    /// The client configuration.
    pub fn config(&self) -> &IntrospectionConfig {
        &self.config
    }

    /// Introspect a token at the endpoint, refreshing the cache.
    pub async fn introspect(
        &self,
        token: &str,
    ) -> Result<IntrospectionOutcome, IntrospectionError> {
        let deadline = Duration::from_secs(self.config.timeout_secs);

        let mut request = self
            .http
            .post(&self.config.endpoint_url)
            .form(&[("token", token), ("token_type_hint", "access_token")]);
        if let Some(client_id) = &self.config.client_id {
            request = request.basic_auth(client_id, self.config.client_secret.as_deref());
        }

        let response = tokio::time::timeout(deadline, request.send())
            .await
            .map_err(|_| IntrospectionError::Timeout {
                deadline_secs: self.config.timeout_secs,
            })?
            .map_err(|e| IntrospectionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(IntrospectionError::Endpoint {
                status: status.as_u16(),
            });
        }

        let result: IntrospectionResult = response
            .json()
            .await
            .map_err(|e| IntrospectionError::Decode(e.to_string()))?;

        let cached_at_millis = self.clock.now_unix_millis();
        self.cache.insert(
            token_digest(token),
            CacheEntry {
                result: result.clone(),
                cached_at_millis,
            },
        );

        tracing::debug!(active = result.active, "token introspected");
        Ok(IntrospectionOutcome {
            result,
            from_cache: false,
            cached_at_millis,
        })
    }

    /// Serve from the cache when fresh enough, otherwise introspect.
    ///
    /// The effective bound is `min(max_age_ms or the default,
    /// max_cache_ttl_ms)`.
    pub async fn cached_introspect(
        &self,
        token: &str,
        max_age_ms: Option<u64>,
    ) -> Result<IntrospectionOutcome, IntrospectionError> {
        let bound = max_age_ms
            .unwrap_or(self.config.default_cache_max_age_ms)
            .min(self.config.max_cache_ttl_ms);

        let digest = token_digest(token);
        if let Some(entry) = self.cache.get(&digest) {
            let age = self
                .clock
                .now_unix_millis()
                .saturating_sub(entry.cached_at_millis);
            if age <= bound {
                return Ok(IntrospectionOutcome {
                    result: entry.result.clone(),
                    from_cache: true,
                    cached_at_millis: entry.cached_at_millis,
                });
            }
        }

        self.introspect(token).await
    }

    /// Invalidate one token's cache entry, or the whole cache.
    pub fn clear_cache(&self, token: Option<&str>) {
        match token {
            Some(token) => {
                self.cache.remove(&token_digest(token));
            }
            None => self.cache.clear(),
        }
    }

    /// Number of cached entries.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop entries older than twice the default cache age.
    pub fn sweep(&self) {
        let retention = self.config.default_cache_max_age_ms * 2;
        let now = self.clock.now_unix_millis();
        self.cache
            .retain(|_, entry| now.saturating_sub(entry.cached_at_millis) <= retention);
    }

    /// Start a periodic sweep task. Must be called within a tokio
    /// runtime; calling it twice replaces the previous sweeper.
    pub fn start_sweeper(&self) {
        let cache = Arc::clone(&self.cache);
        let clock = Arc::clone(&self.clock);
        let shutdown = Arc::clone(&self.sweeper_shutdown);
        let retention = self.config.default_cache_max_age_ms * 2;
        let period = Duration::from_millis(retention.max(1_000));

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = clock.now_unix_millis();
                        cache.retain(|_, entry| {
                            now.saturating_sub(entry.cached_at_millis) <= retention
                        });
                    }
                    () = shutdown.notified() => break,
                }
            }
        });

        if let Some(previous) = self
            .sweeper_task
            .lock()
            .expect("sweeper lock")
            .replace(task)
        {
            previous.abort();
        }
    }

    /// Stop the sweeper (if running) and clear the cache.
    pub fn shutdown(&self) {
        self.sweeper_shutdown.notify_waiters();
        if let Some(task) = self.sweeper_task.lock().expect("sweeper lock").take() {
            task.abort();
        }
        self.cache.clear();
    }
}

impl Drop for IntrospectionClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(IntrospectionConfig::new("not a url").validate().is_err());
        assert!(
            IntrospectionConfig::new("https://issuer.example.com/introspect")
                .validate()
                .is_ok()
        );

        let mut config = IntrospectionConfig::new("https://issuer.example.com/introspect");
        config.client_secret = Some("secret".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_digest_hides_token() {
        let digest = token_digest("super-secret-token");
        assert_eq!(digest.len(), 64);
        assert!(!digest.contains("super"));
        assert_eq!(digest, token_digest("super-secret-token"));
    }

    #[test]
    fn test_inactive_only_response_parses() {
        // RFC 7662 allows a bare {"active": false}.
        let result: IntrospectionResult = serde_json::from_str(r#"{"active":false}"#).unwrap();
        assert!(!result.active);
        assert!(result.sub.is_none());
    }
}
