//! TTL + least-frequently-used cache of subdomain → tenant resolutions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use serde::Serialize;

use crate::config::CacheConfig;
use crate::observability::metrics;

/// Outcome of a backing-store lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Resolved,
    NotFound,
}

/// A cached resolution.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Empty for negative entries.
    pub tenant_id: String,
    pub status: LookupStatus,
    pub inserted_at: Instant,
    /// Number of hits since insertion.
    pub access_count: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) > ttl
    }
}

/// Point-in-time counters for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Bounded tenant cache shared by all request handlers.
#[derive(Debug)]
pub struct TenantCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl TenantCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(capacity.min(4096))),
            ttl,
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.capacity)
    }

    /// Canonical cache key for a subdomain.
    pub fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Look up a subdomain, counting the hit.
    ///
    /// Expired entries are removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<CacheEntry> {
        let key = Self::normalize(key);
        let mut entries = self.lock();

        let expired = match entries.get_mut(&key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) if entry.is_expired(now, self.ttl) => true,
            Some(entry) => {
                entry.access_count += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.clone());
            }
        };

        if expired {
            entries.remove(&key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_size(entries.len());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace a resolution.
    ///
    /// A new key arriving at capacity evicts the entry with the fewest hits
    /// (oldest first on ties) before it is inserted.
    pub fn set(&self, key: &str, tenant_id: impl Into<String>, status: LookupStatus) {
        self.set_at(key, tenant_id.into(), status, Instant::now());
    }

    pub(crate) fn set_at(&self, key: &str, tenant_id: String, status: LookupStatus, now: Instant) {
        let key = Self::normalize(key);
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| (entry.access_count, entry.inserted_at))
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(evicted = %victim, "Tenant cache at capacity, evicted least used entry");
            }
        }

        entries.insert(key, CacheEntry {
            tenant_id,
            status,
            inserted_at: now,
            access_count: 0,
        });
        metrics::record_cache_size(entries.len());
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        let removed = before - entries.len();
        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            metrics::record_cache_size(entries.len());
        }
        removed
    }

    /// Remove one subdomain. Returns true if it was cached.
    pub fn invalidate(&self, key: &str) -> bool {
        let key = Self::normalize(key);
        let mut entries = self.lock();
        let removed = entries.remove(&key).is_some();
        metrics::record_cache_size(entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn test_get_counts_accesses() {
        let cache = TenantCache::new(TTL, 10);
        cache.set("acme", "abc", LookupStatus::Resolved);

        let first = cache.get("acme").unwrap();
        assert_eq!(first.tenant_id, "abc");
        assert_eq!(first.status, LookupStatus::Resolved);
        assert_eq!(first.access_count, 1);
        assert_eq!(cache.get("acme").unwrap().access_count, 2);
        assert_eq!(cache.get("acme").unwrap().access_count, 3);
    }

    #[test]
    fn test_keys_are_normalized() {
        let cache = TenantCache::new(TTL, 10);
        cache.set("  TenantA ", "abc", LookupStatus::Resolved);
        assert!(cache.get("tenanta").is_some());
        assert!(cache.get("TENANTA").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_absent_and_removed() {
        let cache = TenantCache::new(TTL, 10);
        let start = Instant::now();
        cache.set_at("acme", "abc".into(), LookupStatus::Resolved, start);

        assert!(cache.get_at("acme", start + Duration::from_secs(299)).is_some());
        assert!(cache.get_at("acme", start + Duration::from_secs(301)).is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_negative_entries_are_cached() {
        let cache = TenantCache::new(TTL, 10);
        cache.set("ghost", "", LookupStatus::NotFound);
        let entry = cache.get("ghost").unwrap();
        assert_eq!(entry.status, LookupStatus::NotFound);
        assert!(entry.tenant_id.is_empty());
    }

    #[test]
    fn test_evicts_least_accessed() {
        let cache = TenantCache::new(TTL, 3);
        cache.set("a", "1", LookupStatus::Resolved);
        cache.set("b", "2", LookupStatus::Resolved);
        cache.set("c", "3", LookupStatus::Resolved);

        cache.get("a");
        cache.get("a");
        cache.get("c");

        cache.set("d", "4", LookupStatus::Resolved);
        assert_eq!(cache.len(), 3);
        assert!(cache.get("b").is_none(), "b had the fewest accesses");
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_tie_evicts_oldest() {
        let cache = TenantCache::new(TTL, 2);
        let start = Instant::now();
        cache.set_at("old", "1".into(), LookupStatus::Resolved, start);
        cache.set_at("new", "2".into(), LookupStatus::Resolved, start + Duration::from_secs(1));
        cache.set_at("newest", "3".into(), LookupStatus::Resolved, start + Duration::from_secs(2));

        let now = start + Duration::from_secs(3);
        assert!(cache.get_at("old", now).is_none());
        assert!(cache.get_at("new", now).is_some());
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let cache = TenantCache::new(TTL, 2);
        cache.set("a", "1", LookupStatus::Resolved);
        cache.set("b", "2", LookupStatus::Resolved);
        cache.set("a", "1b", LookupStatus::Resolved);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").unwrap().tenant_id, "1b");
        assert!(cache.get("b").is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = TenantCache::new(TTL, 10);
        let start = Instant::now();
        cache.set_at("stale", "1".into(), LookupStatus::Resolved, start);
        cache.set_at("fresh", "2".into(), LookupStatus::Resolved, start + Duration::from_secs(200));

        let removed = cache.sweep_at(start + Duration::from_secs(400));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("fresh", start + Duration::from_secs(400)).is_some());
    }

    #[test]
    fn test_invalidate() {
        let cache = TenantCache::new(TTL, 10);
        cache.set("ghost", "", LookupStatus::NotFound);
        assert!(cache.invalidate("GHOST"));
        assert!(!cache.invalidate("ghost"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_sets_never_exceed_capacity() {
        let cache = Arc::new(TenantCache::new(TTL, 50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("t{t}-{i}");
                        cache.set(&key, key.clone(), LookupStatus::Resolved);
                        assert!(cache.len() <= 50);
                        cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
    }
}
