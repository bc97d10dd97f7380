//! Periodic cache and rate-limiter cleanup.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::cache::TenantCache;
use crate::security::RateLimiter;

/// Background sweeps over the shared tables.
pub struct Maintenance {
    cache: Arc<TenantCache>,
    limiter: Arc<RateLimiter>,
    cache_every: Duration,
    limiter_every: Duration,
}

impl Maintenance {
    pub fn new(
        cache: Arc<TenantCache>,
        limiter: Arc<RateLimiter>,
        cache_every: Duration,
        limiter_every: Duration,
    ) -> Self {
        Self { cache, limiter, cache_every, limiter_every }
    }

    /// Run both sweeps until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut cache_tick = interval(self.cache_every);
        let mut limiter_tick = interval(self.limiter_every);
        cache_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        limiter_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Both fire immediately; skip that.
        cache_tick.tick().await;
        limiter_tick.tick().await;

        loop {
            tokio::select! {
                _ = cache_tick.tick() => {
                    let removed = self.cache.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.cache.len(), "Expired tenant cache entries swept");
                    }
                }
                _ = limiter_tick.tick() => {
                    let removed = self.limiter.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "Expired rate-limit windows swept");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Maintenance stopped");
                    return;
                }
            }
        }
    }
}
