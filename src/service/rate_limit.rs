//! Generic sliding-window admission control.
//!
//! Carries no domain knowledge; the engine places one instance in front of
//! each externally exposed surface (quote ingestion, user queries).

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Sliding-window rate limiter keyed by an opaque client identifier.
///
/// Each key holds the timestamps of its admitted requests inside the
/// trailing window. Timestamps are pruned on every check and recorded only
/// on admission, so denied attempts never extend a key's window.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window` per key.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// Check and record an admission for `key` at the current instant.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Check and record an admission for `key` at an explicit instant.
    ///
    /// Exposed so callers with their own clock (and tests) stay
    /// deterministic.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut stamps = self.windows.entry(key.to_string()).or_default();
        stamps.retain(|ts| now.duration_since(*ts) < self.window);
        if stamps.len() < self.max_requests as usize {
            stamps.push(now);
            true
        } else {
            false
        }
    }

    /// Clear a key's history unconditionally.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    /// Drop keys with no timestamps left inside the window.
    ///
    /// Keeps long-idle keys from accumulating; run periodically.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    /// Cleanup relative to an explicit instant.
    pub fn cleanup_at(&self, now: Instant) {
        self.windows.retain(|_, stamps| {
            stamps.retain(|ts| now.duration_since(*ts) < self.window);
            !stamps.is_empty()
        });
    }

    /// Number of keys currently holding state.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_denies() {
        let limiter = RateLimiter::new(30, Duration::from_millis(60_000));
        let start = Instant::now();

        for _ in 0..30 {
            assert!(limiter.check_at("client", start));
        }
        assert!(!limiter.check_at("client", start));
    }

    #[test]
    fn admission_returns_after_window_elapses() {
        let limiter = RateLimiter::new(30, Duration::from_millis(60_000));
        let start = Instant::now();

        for _ in 0..30 {
            assert!(limiter.check_at("client", start));
        }
        assert!(!limiter.check_at("client", start));

        let after_window = start + Duration::from_millis(60_000);
        assert!(limiter.check_at("client", after_window));
    }

    #[test]
    fn reset_restores_admission_immediately() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("client", start));
        assert!(limiter.check_at("client", start));
        assert!(!limiter.check_at("client", start));

        limiter.reset("client");
        assert!(limiter.check_at("client", start));
    }

    #[test]
    fn denied_attempts_are_not_recorded() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("client", start));
        // Denied halfway through; must not refresh the window
        assert!(!limiter.check_at("client", start + Duration::from_secs(30)));
        // The single admitted stamp ages out after the full window
        assert!(limiter.check_at("client", start + Duration::from_secs(60)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start));
        assert!(limiter.check_at("b", start));
    }

    #[test]
    fn cleanup_drops_idle_keys_only() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();

        limiter.check_at("idle", start);
        limiter.check_at("busy", start + Duration::from_secs(55));
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.cleanup_at(start + Duration::from_secs(70));
        assert_eq!(limiter.tracked_keys(), 1);

        // The surviving key still has its stamp
        assert!(limiter.check_at("busy", start + Duration::from_secs(70)));
    }
}
