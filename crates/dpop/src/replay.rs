//! JTI replay cache.
//!
//! The DPoP service consumes replay protection as an abstract capability
//! so deployments can swap the in-process cache for a shared store.

use std::sync::Arc;
use std::time::Duration;

use aci_core::Clock;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Replay-prevention store for proof identifiers.
///
/// `exists` must return `true` iff a live (non-expired) entry is present.
pub trait JtiCache: Send + Sync {
    /// Record a JTI until the given absolute expiry (Unix milliseconds).
    fn store(&self, jti: &str, expires_at_millis: u64);

    /// Whether a live entry exists for this JTI.
    fn exists(&self, jti: &str) -> bool;

    /// Atomically record the JTI unless a live entry already exists.
    ///
    /// Returns `false` if the JTI was already present. In-process
    /// implementations should override this with a single atomic map
    /// operation so concurrent verifications of the same JTI cannot
    /// both succeed.
    fn insert_if_absent(&self, jti: &str, expires_at_millis: u64) -> bool {
        if self.exists(jti) {
            return false;
        }
        self.store(jti, expires_at_millis);
        true
    }
}

/// In-process JTI cache with lazy eviction and an optional periodic
/// sweep task.
pub struct InMemoryJtiCache {
    entries: Arc<DashMap<String, u64>>,
    clock: Arc<dyn Clock>,
    sweeper: SweeperHandle,
}

struct SweeperHandle {
    shutdown: Arc<Notify>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SweeperHandle {
    fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
            task: std::sync::Mutex::new(None),
        }
    }
}

impl InMemoryJtiCache {
    /// Create an empty cache. No sweep task is started; expired entries
    /// are still evicted lazily on lookup.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
            sweeper: SweeperHandle::new(),
        }
    }

    /// Start a periodic sweep of expired entries.
    ///
    /// Must be called from within a tokio runtime. Calling it twice
    /// replaces the previous sweeper.
    pub fn start_sweeper(&self, period: Duration) {
        let entries = Arc::clone(&self.entries);
        let clock = Arc::clone(&self.clock);
        let shutdown = Arc::clone(&self.sweeper.shutdown);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = clock.now_unix_millis();
                        let before = entries.len();
                        entries.retain(|_, expires_at| *expires_at > now);
                        let evicted = before.saturating_sub(entries.len());
                        if evicted > 0 {
                            tracing::debug!(evicted, "swept expired jti entries");
                        }
                    }
                    () = shutdown.notified() => break,
                }
            }
        });

        if let Some(previous) = self.sweeper.task.lock().expect("sweeper lock").replace(task) {
            previous.abort();
        }
    }

    /// Stop the sweeper (if running) and clear all entries.
    pub fn shutdown(&self) {
        self.sweeper.shutdown.notify_waiters();
        if let Some(task) = self.sweeper.task.lock().expect("sweeper lock").take() {
            task.abort();
        }
        self.entries.clear();
    }

    /// Number of live entries (expired entries are not counted).
    pub fn live_len(&self) -> usize {
        let now = self.clock.now_unix_millis();
        self.entries.iter().filter(|e| *e.value() > now).count()
    }
}

impl Drop for InMemoryJtiCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl JtiCache for InMemoryJtiCache {
    fn store(&self, jti: &str, expires_at_millis: u64) {
        self.entries.insert(jti.to_string(), expires_at_millis);
    }

    fn exists(&self, jti: &str) -> bool {
        let now = self.clock.now_unix_millis();
        let live = match self.entries.get(jti) {
            Some(entry) => *entry.value() > now,
            None => return false,
        };
        if !live {
            // Remove only if still the expired entry we saw, so a
            // concurrent `store` with a fresh expiry is never clobbered.
            self.entries.remove_if(jti, |_, expires_at| *expires_at <= now);
        }
        live
    }

    fn insert_if_absent(&self, jti: &str, expires_at_millis: u64) -> bool {
        let now = self.clock.now_unix_millis();
        let mut inserted = false;
        let mut entry = self
            .entries
            .entry(jti.to_string())
            .or_insert_with(|| {
                inserted = true;
                expires_at_millis
            });
        if !inserted && *entry.value() <= now {
            // Dead entry left for the sweeper; revive it atomically.
            *entry.value_mut() = expires_at_millis;
            inserted = true;
        }
        inserted
    }
}
