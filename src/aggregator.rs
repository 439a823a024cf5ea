//! # Aggregator
//! Resolves a logical query against a priority-ordered chain of source
//! adapters, through the TTL cache. Fallback order is strict: a secondary
//! source is only tried after the one before it came back Unavailable —
//! never speculatively, to protect rate-limited quota.
//!
//! When every source in the chain is down, the most recent still-cached
//! value for the query (expired or not) is served tagged `Stale`. Callers
//! branch on `SourceResult.status`; no failure crosses this boundary as an
//! error.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;

use crate::cache::TtlCache;
use crate::sources::types::{Query, QueryKind, SourceAdapter, SourceResult};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregator_fallback_total",
            "Resolves that had to move past the primary source."
        );
        describe_counter!(
            "aggregator_stale_served_total",
            "Resolves answered from an expired cache entry."
        );
        describe_counter!(
            "aggregator_unavailable_total",
            "Resolves with no source and no cached value to fall back on."
        );
        describe_gauge!(
            "aggregator_last_refresh_ts",
            "Unix ts when refresh_all last completed."
        );
    });
}

/// Adapter chain and TTL for one query kind.
pub struct SourceRoute {
    pub ttl_secs: u64,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
}

pub struct Aggregator {
    cache: Arc<TtlCache>,
    routes: HashMap<QueryKind, SourceRoute>,
    // Bounds concurrent outbound fetches across the whole engine.
    fetch_permits: Arc<Semaphore>,
    // Queries seen so far, by logical key; refresh_all re-resolves these.
    tracked: RwLock<HashMap<String, Query>>,
}

impl Aggregator {
    pub fn new(
        cache: Arc<TtlCache>,
        routes: HashMap<QueryKind, SourceRoute>,
        max_concurrent_fetches: usize,
    ) -> Self {
        ensure_metrics_described();
        Self {
            cache,
            routes,
            fetch_permits: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
            tracked: RwLock::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    fn cache_key(adapter: &dyn SourceAdapter, query: &Query) -> String {
        format!("{}:{}", adapter.source_id(), query.key())
    }

    fn track(&self, query: &Query) {
        let mut tracked = self.tracked.write().expect("tracked rwlock poisoned");
        tracked.entry(query.key()).or_insert_with(|| query.clone());
    }

    /// Walk the adapter chain for the query's kind, first answer wins.
    pub async fn resolve(&self, query: &Query) -> SourceResult {
        let key = query.key();
        let route = match self.routes.get(&query.kind) {
            Some(r) => r,
            None => {
                tracing::warn!(query = %key, "no route configured for query kind");
                counter!("aggregator_unavailable_total").increment(1);
                return SourceResult::unavailable("aggregator", &key, self.cache.now());
            }
        };
        self.track(query);

        for (rank, adapter) in route.adapters.iter().enumerate() {
            let cache_key = Self::cache_key(adapter.as_ref(), query);
            let result = self
                .cache
                .get_or_fetch(&cache_key, route.ttl_secs, || async {
                    let _permit = self
                        .fetch_permits
                        .acquire()
                        .await
                        .expect("fetch semaphore closed");
                    adapter.fetch(query).await
                })
                .await;

            if result.is_available() {
                if rank > 0 {
                    counter!("aggregator_fallback_total").increment(1);
                    tracing::info!(
                        query = %key,
                        source = adapter.source_id(),
                        rank,
                        "resolved via fallback source"
                    );
                }
                return result;
            }
        }

        // Every source is down: serve the freshest value any of them ever
        // produced, tagged Stale. Negative-cache entries carry no payload
        // and are skipped here.
        if let Some(prev) = self.best_cached(query) {
            counter!("aggregator_stale_served_total").increment(1);
            tracing::warn!(query = %key, "all sources unavailable, serving stale cache");
            return prev.into_stale();
        }

        counter!("aggregator_unavailable_total").increment(1);
        SourceResult::unavailable("aggregator", &key, self.cache.now())
    }

    /// Resolve under a caller-supplied budget. On expiry, in-flight fetches
    /// are abandoned and the last cached value is returned instead of an
    /// error; the caller sees a `Stale` (or `Unavailable`) result, never a
    /// timeout.
    pub async fn resolve_with_timeout(&self, query: &Query, budget: Duration) -> SourceResult {
        match tokio::time::timeout(budget, self.resolve(query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(query = %query.key(), budget_ms = budget.as_millis() as u64, "resolve timed out");
                match self.best_cached(query) {
                    Some(prev) => prev.into_stale(),
                    None => SourceResult::unavailable("aggregator", &query.key(), self.cache.now()),
                }
            }
        }
    }

    fn best_cached(&self, query: &Query) -> Option<SourceResult> {
        let route = self.routes.get(&query.kind)?;
        route
            .adapters
            .iter()
            .filter_map(|a| self.cache.get_last_good(&Self::cache_key(a.as_ref(), query)))
            .max_by_key(|r| r.fetched_at)
    }

    /// Proactively re-resolve every tracked query whose cache entry is
    /// expired or expires within `within_secs`. Fan-out is bounded by the
    /// shared fetch semaphore. Returns the number of queries refreshed.
    pub async fn refresh_all(self: &Arc<Self>, within_secs: u64) -> usize {
        let near: HashSet<String> = self.cache.keys_near_expiry(within_secs).into_iter().collect();
        // A query is due when one of the exact cache keys its route would
        // produce is near expiry. Suffix matching on the logical key is not
        // enough: product names are free-form config strings, so one logical
        // key can be embedded inside another.
        let due: Vec<Query> = {
            let tracked = self.tracked.read().expect("tracked rwlock poisoned");
            tracked
                .values()
                .filter(|q| {
                    self.routes.get(&q.kind).is_some_and(|route| {
                        route
                            .adapters
                            .iter()
                            .any(|a| near.contains(&Self::cache_key(a.as_ref(), q)))
                    })
                })
                .cloned()
                .collect()
        };

        let mut joins = tokio::task::JoinSet::new();
        for query in due {
            // Drop near-expiry entries for this query so resolve refetches
            // instead of serving the about-to-expire value. The last-good
            // copy is kept, so a failed refetch still has a stale fallback.
            if let Some(route) = self.routes.get(&query.kind) {
                for adapter in &route.adapters {
                    let cache_key = Self::cache_key(adapter.as_ref(), &query);
                    if near.contains(&cache_key) {
                        self.cache.invalidate(&cache_key);
                    }
                }
            }
            let agg = Arc::clone(self);
            joins.spawn(async move {
                let _ = agg.resolve(&query).await;
            });
        }

        let mut refreshed = 0usize;
        while let Some(res) = joins.join_next().await {
            if res.is_ok() {
                refreshed += 1;
            }
        }

        gauge!("aggregator_last_refresh_ts").set(self.cache.now() as f64);
        tracing::info!(refreshed, "refresh pass complete");
        refreshed
    }
}
