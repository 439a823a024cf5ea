// src/sources/types.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Freshness of a fetched value relative to its source TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Fresh,
    Stale,
    Unavailable,
}

/// Result of a single fetch attempt against one external source.
///
/// Immutable value: a refresh produces a new `SourceResult` for the same
/// `query_key`, it never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source_id: String,
    pub query_key: String,
    pub payload: Option<serde_json::Value>,
    pub fetched_at: u64, // unix seconds
    pub status: SourceStatus,
}

impl SourceResult {
    pub fn fresh(
        source_id: &str,
        query_key: &str,
        payload: serde_json::Value,
        fetched_at: u64,
    ) -> Self {
        Self {
            source_id: source_id.to_string(),
            query_key: query_key.to_string(),
            payload: Some(payload),
            fetched_at,
            status: SourceStatus::Fresh,
        }
    }

    pub fn unavailable(source_id: &str, query_key: &str, fetched_at: u64) -> Self {
        Self {
            source_id: source_id.to_string(),
            query_key: query_key.to_string(),
            payload: None,
            fetched_at,
            status: SourceStatus::Unavailable,
        }
    }

    /// Re-tag as stale, e.g. when served from an expired cache entry.
    pub fn into_stale(mut self) -> Self {
        if self.status == SourceStatus::Fresh {
            self.status = SourceStatus::Stale;
        }
        self
    }

    /// Fresh or stale with an actual payload; usable for scoring.
    pub fn is_available(&self) -> bool {
        self.status != SourceStatus::Unavailable && self.payload.is_some()
    }
}

/// Closed set of logical query types the engine can resolve.
/// Each kind maps to a typed adapter chain; there is no stringly-typed
/// tool dispatch anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// FOB price at origin (African exchange / export feed).
    SourcingPrice,
    /// Wholesale price in the target US market.
    ReferencePrice,
    ExchangeRates,
    /// Customs import statistics by HS commodity code.
    TradeFlows,
    TradeNews,
}

impl QueryKind {
    pub fn slug(&self) -> &'static str {
        match self {
            QueryKind::SourcingPrice => "sourcing_price",
            QueryKind::ReferencePrice => "reference_price",
            QueryKind::ExchangeRates => "exchange_rates",
            QueryKind::TradeFlows => "trade_flows",
            QueryKind::TradeNews => "trade_news",
        }
    }
}

/// A logical request: kind plus an optional parameter (product id for
/// price queries, HS code for trade flows).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub kind: QueryKind,
    pub param: Option<String>,
}

impl Query {
    pub fn new(kind: QueryKind, param: Option<&str>) -> Self {
        Self {
            kind,
            param: param.map(str::to_string),
        }
    }

    pub fn sourcing_price(product: &str) -> Self {
        Self::new(QueryKind::SourcingPrice, Some(product))
    }

    pub fn reference_price(product: &str) -> Self {
        Self::new(QueryKind::ReferencePrice, Some(product))
    }

    pub fn exchange_rates() -> Self {
        Self::new(QueryKind::ExchangeRates, None)
    }

    pub fn trade_flows(hs_code: &str) -> Self {
        Self::new(QueryKind::TradeFlows, Some(hs_code))
    }

    pub fn trade_news() -> Self {
        Self::new(QueryKind::TradeNews, None)
    }

    /// Logical cache key for this query (without the source id prefix).
    pub fn key(&self) -> String {
        match &self.param {
            Some(p) => format!("{}:{}", self.kind.slug(), p),
            None => self.kind.slug().to_string(),
        }
    }
}

/// Internal fetch failure taxonomy. Transient errors are retried with
/// backoff; permanent ones are not. Neither crosses the adapter boundary:
/// adapters translate both into `SourceStatus::Unavailable`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient source error: {0}")]
    Transient(String),
    #[error("permanent source error: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    /// Classify a reqwest failure. Connect/timeout problems are transient;
    /// 429 and 5xx are transient (server-side, worth a retry); other 4xx
    /// and body/decode errors are permanent.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return FetchError::Transient(e.to_string());
        }
        if let Some(status) = e.status() {
            return Self::from_status(status.as_u16(), e.to_string());
        }
        FetchError::Permanent(e.to_string())
    }

    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            429 | 500..=599 => FetchError::Transient(format!("HTTP {status}: {detail}")),
            _ => FetchError::Permanent(format!("HTTP {status}: {detail}")),
        }
    }
}

/// Uniform contract over one external data source.
///
/// `fetch` never returns `Err` for ordinary failure modes (network error,
/// timeout, malformed response, rate limit); those become an `Unavailable`
/// result the caller branches on. Only misconfiguration is fatal, and that
/// is caught at adapter construction, not here.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &'static str;
    async fn fetch(&self, query: &Query) -> SourceResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_key_includes_param() {
        assert_eq!(Query::sourcing_price("coffee").key(), "sourcing_price:coffee");
        assert_eq!(Query::exchange_rates().key(), "exchange_rates");
    }

    #[test]
    fn stale_retag_keeps_unavailable() {
        let u = SourceResult::unavailable("x", "k", 0).into_stale();
        assert_eq!(u.status, SourceStatus::Unavailable);
        let f = SourceResult::fresh("x", "k", serde_json::json!(1), 0).into_stale();
        assert_eq!(f.status, SourceStatus::Stale);
    }

    #[test]
    fn status_classification() {
        assert!(FetchError::from_status(429, "rl".into()).is_transient());
        assert!(FetchError::from_status(503, "down".into()).is_transient());
        assert!(!FetchError::from_status(404, "gone".into()).is_transient());
        assert!(!FetchError::from_status(400, "bad".into()).is_transient());
    }
}
