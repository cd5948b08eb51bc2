//! Revocation status cache with caller-supplied staleness bounds.

use std::sync::Arc;

use aci_core::Clock;
use dashmap::DashMap;

use crate::types::RevocationStatus;

#[derive(Debug, Clone, Copy)]
struct CachedStatus {
    status: RevocationStatus,
    cached_at_millis: u64,
}

/// Process-wide cache of revocation statuses.
///
/// Entries carry their write time; the acceptable age is supplied per
/// read because it is the reader's tier SLA, not a cache property.
/// Writes from the revocation engine invalidate synchronously, so a
/// revocation is never shadowed by a stale `Active` entry beyond the
/// SLA window.
pub struct RevocationStatusCache {
    entries: DashMap<String, CachedStatus>,
    clock: Arc<dyn Clock>,
}

impl RevocationStatusCache {
    /// Create an empty cache.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Cached status for a DID if it is younger than `max_age_ms`.
    pub fn get(&self, did: &str, max_age_ms: u64) -> Option<RevocationStatus> {
        let now = self.clock.now_unix_millis();
        let cached = self.entries.get(did).map(|entry| *entry.value())?;
        if now.saturating_sub(cached.cached_at_millis) > max_age_ms {
            return None;
        }
        Some(cached.status)
    }

    /// Record a freshly observed status.
    pub fn insert(&self, did: &str, status: RevocationStatus) {
        self.entries.insert(
            did.to_string(),
            CachedStatus {
                status,
                cached_at_millis: self.clock.now_unix_millis(),
            },
        );
    }

    /// Drop the entry for a DID so the next read misses.
    pub fn invalidate(&self, did: &str) {
        self.entries.remove(did);
    }

    /// Drop every entry older than `retention_ms`.
    pub fn sweep(&self, retention_ms: u64) {
        let now = self.clock.now_unix_millis();
        self.entries
            .retain(|_, cached| now.saturating_sub(cached.cached_at_millis) <= retention_ms);
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aci_core::ManualClock;

    #[test]
    fn test_age_bound_is_reader_supplied() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = RevocationStatusCache::new(clock.clone());

        cache.insert("did:aci:a", RevocationStatus::Active);
        clock.advance_millis(5_000);

        // Fresh enough for a T0 reader (60s), too stale for a T4 reader (1s).
        assert_eq!(
            cache.get("did:aci:a", 60_000),
            Some(RevocationStatus::Active)
        );
        assert_eq!(cache.get("did:aci:a", 1_000), None);
    }

    #[test]
    fn test_invalidate_forces_miss() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = RevocationStatusCache::new(clock);

        cache.insert("did:aci:a", RevocationStatus::Active);
        cache.invalidate("did:aci:a");
        assert_eq!(cache.get("did:aci:a", 60_000), None);
    }

    #[test]
    fn test_sweep_retention() {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let cache = RevocationStatusCache::new(clock.clone());

        cache.insert("old", RevocationStatus::Active);
        clock.advance_millis(90_000);
        cache.insert("new", RevocationStatus::Revoked);

        cache.sweep(60_000);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new", 60_000), Some(RevocationStatus::Revoked));
    }
}
