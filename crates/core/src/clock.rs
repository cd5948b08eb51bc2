//! Clock abstraction for TTL arithmetic.
//!
//! All cache expiry and `iat`/`exp` comparisons in the security core go
//! through [`Clock`] so tests can inject time instead of sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of Unix time with millisecond resolution.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_unix_millis(&self) -> u64;

    /// Seconds since the Unix epoch.
    fn now_unix_secs(&self) -> u64 {
        self.now_unix_millis() / 1000
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_unix_millis(&self) -> u64 {
        (**self).now_unix_millis()
    }
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock pinned to the given Unix time in seconds.
    pub fn at_secs(secs: u64) -> Self {
        Self {
            millis: AtomicU64::new(secs * 1000),
        }
    }

    /// Set the absolute time in milliseconds.
    pub fn set_millis(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Advance the clock by the given number of seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::at_secs(1_700_000_000);
        assert_eq!(clock.now_unix_secs(), 1_700_000_000);
        clock.advance_secs(90);
        assert_eq!(clock.now_unix_secs(), 1_700_000_090);
        clock.advance_millis(500);
        assert_eq!(clock.now_unix_millis(), 1_700_000_090_500);
    }

    #[test]
    fn test_system_clock_sane() {
        // Any time after 2023-01-01 is plausible for a running test host.
        assert!(SystemClock.now_unix_secs() > 1_672_531_200);
    }
}
