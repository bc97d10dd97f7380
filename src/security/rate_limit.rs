//! Fixed-window rate limiting per client identity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client::UNKNOWN_CLIENT;

/// Per-client counter for the current window.
#[derive(Debug, Clone)]
struct RateWindow {
    count: u32,
    window_reset_at: Instant,
    last_warned_at: Option<Instant>,
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Whole seconds until the window resets, rounded up.
    pub reset_after_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStats {
    pub tracked_clients: usize,
    pub limited_total: u64,
    pub unknown_client_hits: u64,
}

/// Fixed-window limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    window: Duration,
    max_requests: u32,
    warn_interval: Duration,
    limited_total: AtomicU64,
    unknown_client_hits: AtomicU64,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, warn_interval: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            max_requests,
            warn_interval,
            limited_total: AtomicU64::new(0),
            unknown_client_hits: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests, config.warn_interval())
    }

    /// Count a request from `client_id` and report whether it is over the limit.
    pub fn check(&self, client_id: &str) -> RateLimitOutcome {
        self.check_at(client_id, Instant::now())
    }

    pub(crate) fn check_at(&self, client_id: &str, now: Instant) -> RateLimitOutcome {
        if client_id == UNKNOWN_CLIENT {
            self.unknown_client_hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_unknown_client();
        }

        let mut windows = self.lock();
        let window = windows
            .entry(client_id.to_string())
            .or_insert_with(|| RateWindow {
                count: 0,
                window_reset_at: now + self.window,
                last_warned_at: None,
            });

        // An elapsed window restarts at this request.
        if now >= window.window_reset_at {
            window.count = 1;
            window.window_reset_at = now + self.window;
        } else {
            window.count = window.count.saturating_add(1);
        }

        let limited = window.count > self.max_requests;
        let reset_after_secs = ceil_secs(window.window_reset_at.saturating_duration_since(now));

        if limited {
            self.limited_total.fetch_add(1, Ordering::Relaxed);
            metrics::record_rate_limited();

            let should_warn = window
                .last_warned_at
                .map_or(true, |at| now.saturating_duration_since(at) >= self.warn_interval);
            if should_warn {
                window.last_warned_at = Some(now);
                tracing::warn!(
                    client = %client_id,
                    count = window.count,
                    limit = self.max_requests,
                    reset_after_secs,
                    "Rate limit exceeded"
                );
            }
        }

        RateLimitOutcome {
            limited,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_after_secs,
        }
    }

    /// Purge clients whose window has already ended. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, window| now < window.window_reset_at);
        before - windows.len()
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            tracked_clients: self.lock().len(),
            limited_total: self.limited_total.load(Ordering::Relaxed),
            unknown_client_hits: self.unknown_client_hits.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(60), 100, Duration::from_secs(300))
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter();
        let now = Instant::now();
        for i in 1..=100 {
            let outcome = limiter.check_at("10.0.0.1", now);
            assert!(!outcome.limited, "request {i} should pass");
            assert_eq!(outcome.remaining, 100 - i);
        }
        let outcome = limiter.check_at("10.0.0.1", now + Duration::from_secs(10));
        assert!(outcome.limited);
        assert_eq!(outcome.remaining, 0);
        assert_eq!(outcome.reset_after_secs, 50);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..101 {
            limiter.check_at("a", now);
        }
        assert!(limiter.check_at("a", now).limited);
        assert!(!limiter.check_at("b", now).limited);
    }

    #[test]
    fn test_window_reset_restarts_at_one() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..150 {
            limiter.check_at("c", start);
        }
        let later = start + Duration::from_secs(61);
        let outcome = limiter.check_at("c", later);
        assert!(!outcome.limited);
        assert_eq!(outcome.remaining, 99, "count restarts at 1, not 101");
        assert_eq!(outcome.reset_after_secs, 60);
    }

    #[test]
    fn test_sweep_drops_only_expired_windows() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.check_at("old", start);
        limiter.check_at("new", start + Duration::from_secs(30));

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.stats().tracked_clients, 1);
    }

    #[test]
    fn test_warning_is_throttled() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1, Duration::from_secs(300));
        let start = Instant::now();
        limiter.check_at("noisy", start);
        limiter.check_at("noisy", start);
        let warned = limiter.lock().get("noisy").and_then(|w| w.last_warned_at);
        assert_eq!(warned, Some(start));

        limiter.check_at("noisy", start + Duration::from_secs(30));
        let warned = limiter.lock().get("noisy").and_then(|w| w.last_warned_at);
        assert_eq!(warned, Some(start), "second warning suppressed inside the interval");
    }

    #[test]
    fn test_unknown_bucket_is_tracked() {
        let limiter = limiter();
        limiter.check(UNKNOWN_CLIENT);
        limiter.check(UNKNOWN_CLIENT);
        limiter.check("1.2.3.4");
        let stats = limiter.stats();
        assert_eq!(stats.unknown_client_hits, 2);
        assert_eq!(stats.tracked_clients, 2);
    }
}
