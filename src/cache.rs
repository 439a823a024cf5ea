//! # TTL Cache
//! In-memory cache keyed by `source_id + query key`, with per-entry TTLs,
//! negative caching of failures, and single-flight deduplication of
//! concurrent fetches for the same key.
//!
//! Entry lifecycle: Empty -> Fresh -> Stale -> (refetch) -> Fresh, or
//! Unavailable held briefly under the negative TTL. Entries are replaced,
//! never mutated in place.
//!
//! There is deliberately no global instance: the engine owns one `TtlCache`
//! and hands it to the aggregator by `Arc`, so tests can inject isolated
//! caches with their own clocks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use metrics::counter;

use crate::sources::types::SourceResult;

type ClockFn = Arc<dyn Fn() -> u64 + Send + Sync>;

/// One cached value with its absolute expiry (unix seconds).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: SourceResult,
    pub expires_at: u64,
}

pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    // Last result per key that actually carried a payload. Survives
    // negative-cache overwrites and invalidation of the live entry, so the
    // aggregator's stale fallback always has something to serve.
    last_good: RwLock<HashMap<String, SourceResult>>,
    // Per-key async locks; a lock exists only while a fetch is in flight.
    inflight: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    negative_ttl_secs: u64,
    clock: ClockFn,
}

impl TtlCache {
    /// Cache on the system clock.
    pub fn new(negative_ttl_secs: u64) -> Self {
        Self::with_clock(
            negative_ttl_secs,
            Arc::new(|| chrono::Utc::now().timestamp().max(0) as u64),
        )
    }

    /// Cache with an injected clock, for expiry tests without sleeping.
    pub fn with_clock(negative_ttl_secs: u64, clock: ClockFn) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            last_good: RwLock::new(HashMap::new()),
            inflight: tokio::sync::Mutex::new(HashMap::new()),
            negative_ttl_secs,
            clock,
        }
    }

    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Cached value if it has not expired yet.
    pub fn get(&self, key: &str) -> Option<SourceResult> {
        let now = self.now();
        let entries = self.entries.read().expect("cache rwlock poisoned");
        match entries.get(key) {
            Some(e) if now < e.expires_at => {
                counter!("cache_hits_total").increment(1);
                Some(e.value.clone())
            }
            Some(_) => {
                counter!("cache_expired_total").increment(1);
                None
            }
            None => {
                counter!("cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Cached value regardless of expiry; the aggregator's last-known-good
    /// fallback path reads expired entries through this.
    pub fn get_any(&self, key: &str) -> Option<SourceResult> {
        let entries = self.entries.read().expect("cache rwlock poisoned");
        entries.get(key).map(|e| e.value.clone())
    }

    /// Most recent payload-carrying value for the key, expired or not.
    pub fn get_last_good(&self, key: &str) -> Option<SourceResult> {
        let last_good = self.last_good.read().expect("cache rwlock poisoned");
        last_good.get(key).cloned()
    }

    /// Store/replace the entry with `expires_at = now + ttl_secs`.
    pub fn put(&self, key: &str, value: SourceResult, ttl_secs: u64) {
        let expires_at = self.now().saturating_add(ttl_secs);
        if value.is_available() {
            let mut last_good = self.last_good.write().expect("cache rwlock poisoned");
            last_good.insert(key.to_string(), value.clone());
        }
        let mut entries = self.entries.write().expect("cache rwlock poisoned");
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().expect("cache rwlock poisoned");
        entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache rwlock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys whose entry is already expired or expires within `within_secs`.
    /// Drives the proactive refresh pass.
    pub fn keys_near_expiry(&self, within_secs: u64) -> Vec<String> {
        let horizon = self.now().saturating_add(within_secs);
        let entries = self.entries.read().expect("cache rwlock poisoned");
        entries
            .iter()
            .filter(|(_, e)| e.expires_at <= horizon)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Serve a fresh hit, or run `fetch_fn` exactly once per key even under
    /// concurrent callers. Every caller for the key awaits the same flight
    /// and observes its stored result. Unavailable results are stored under
    /// the short negative TTL so a failing source is not hammered.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl_secs: u64, fetch_fn: F) -> SourceResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SourceResult>,
    {
        if let Some(v) = self.get(key) {
            return v;
        }

        let flight = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let result = {
            let _guard = flight.lock().await;

            // Losers of the race land here after the winner stored its
            // result; the re-check turns them into cache hits.
            if let Some(v) = self.get(key) {
                counter!("cache_singleflight_coalesced_total").increment(1);
                v
            } else {
                let fetched = fetch_fn().await;
                let ttl = if fetched.is_available() {
                    ttl_secs
                } else {
                    self.negative_ttl_secs
                };
                self.put(key, fetched.clone(), ttl);
                fetched
            }
        };

        // Drop the per-key lock entry once nobody else holds it.
        let mut inflight = self.inflight.lock().await;
        let unused = inflight
            .get(key)
            .is_some_and(|entry| Arc::strong_count(entry) <= 2);
        if unused {
            inflight.remove(key);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::types::SourceStatus;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn manual_clock(start: u64) -> (Arc<AtomicU64>, ClockFn) {
        let t = Arc::new(AtomicU64::new(start));
        let t2 = t.clone();
        (t, Arc::new(move || t2.load(Ordering::SeqCst)))
    }

    fn value(key: &str) -> SourceResult {
        SourceResult::fresh("stub", key, serde_json::json!({"v": 1}), 1_000)
    }

    #[test]
    fn get_after_put_returns_value() {
        let (_, clock) = manual_clock(1_000);
        let cache = TtlCache::with_clock(60, clock);
        cache.put("k", value("k"), 30);
        assert_eq!(cache.get("k"), Some(value("k")));
    }

    #[test]
    fn get_after_ttl_elapsed_is_none() {
        let (t, clock) = manual_clock(1_000);
        let cache = TtlCache::with_clock(60, clock);
        cache.put("k", value("k"), 30);
        t.store(1_030, Ordering::SeqCst); // expires_at == now -> expired
        assert_eq!(cache.get("k"), None);
        // still reachable through the stale path
        assert!(cache.get_any("k").is_some());
    }

    #[test]
    fn invalidate_removes_entry() {
        let (_, clock) = manual_clock(1_000);
        let cache = TtlCache::with_clock(60, clock);
        cache.put("k", value("k"), 30);
        cache.invalidate("k");
        assert!(cache.get_any("k").is_none());
    }

    #[test]
    fn keys_near_expiry_includes_expired_and_soon() {
        let (_, clock) = manual_clock(1_000);
        let cache = TtlCache::with_clock(60, clock);
        cache.put("soon", value("soon"), 100);
        cache.put("later", value("later"), 10_000);
        let mut keys = cache.keys_near_expiry(300);
        keys.sort();
        assert_eq!(keys, vec!["soon".to_string()]);
    }

    #[test]
    fn last_good_survives_negative_overwrite_and_invalidation() {
        let (_, clock) = manual_clock(1_000);
        let cache = TtlCache::with_clock(60, clock);
        cache.put("k", value("k"), 30);
        cache.put("k", SourceResult::unavailable("stub", "k", 1_010), 60);
        assert_eq!(cache.get_last_good("k"), Some(value("k")));
        cache.invalidate("k");
        assert_eq!(cache.get_last_good("k"), Some(value("k")));
    }

    #[tokio::test]
    async fn unavailable_results_get_negative_ttl() {
        let (t, clock) = manual_clock(1_000);
        let cache = TtlCache::with_clock(60, clock);

        let r = cache
            .get_or_fetch("k", 1_800, || async {
                SourceResult::unavailable("stub", "k", 1_000)
            })
            .await;
        assert_eq!(r.status, SourceStatus::Unavailable);

        // Within the negative TTL the failure is served from cache.
        assert_eq!(cache.get("k").map(|v| v.status), Some(SourceStatus::Unavailable));

        // After the negative TTL the key misses again.
        t.store(1_061, Ordering::SeqCst);
        assert_eq!(cache.get("k"), None);
    }
}
