// src/sources/providers/commodity.rs
//
// Commodity price feed adapter. The upstream returns one document with all
// quoted products (`{"prices": {"coffee": 4.2, ...}}`); the adapter extracts
// the product named by the query so the cached payload matches the cache key.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::sources::types::{Query, SourceAdapter, SourceResult};
use crate::sources::{get_text_with_retry, now_unix, DEFAULT_FETCH_TIMEOUT};

#[derive(Debug, Deserialize)]
struct PriceFeed {
    prices: HashMap<String, f64>,
}

pub struct CommodityPriceAdapter {
    source_id: &'static str,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl CommodityPriceAdapter {
    /// Canned feed body; used in tests and offline runs.
    pub fn from_fixture(source_id: &'static str, body: &str) -> Self {
        Self {
            source_id,
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(source_id: &'static str, url: &str) -> Self {
        Self {
            source_id,
            mode: Mode::Http {
                url: url.to_string(),
                client: reqwest::Client::new(),
                timeout: DEFAULT_FETCH_TIMEOUT,
            },
        }
    }

    fn parse_product(&self, body: &str, product: &str) -> Result<serde_json::Value> {
        let feed: PriceFeed = serde_json::from_str(body)
            .with_context(|| format!("parsing {} price feed", self.source_id))?;
        let price = feed
            .prices
            .get(product)
            .copied()
            .ok_or_else(|| anyhow!("product '{product}' not quoted by {}", self.source_id))?;
        Ok(json!({ "product": product, "usd_per_kg": price }))
    }
}

#[async_trait]
impl SourceAdapter for CommodityPriceAdapter {
    fn source_id(&self) -> &'static str {
        self.source_id
    }

    async fn fetch(&self, query: &Query) -> SourceResult {
        let key = query.key();
        let now = now_unix();

        let product = match query.param.as_deref() {
            Some(p) => p,
            None => {
                tracing::warn!(source = self.source_id, "price query without product param");
                return SourceResult::unavailable(self.source_id, &key, now);
            }
        };

        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http {
                url,
                client,
                timeout,
            } => match get_text_with_retry(client, self.source_id, url, *timeout).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(source = self.source_id, error = %e, "price feed unavailable");
                    return SourceResult::unavailable(self.source_id, &key, now);
                }
            },
        };

        match self.parse_product(&body, product) {
            Ok(payload) => SourceResult::fresh(self.source_id, &key, payload, now),
            Err(e) => {
                tracing::warn!(source = self.source_id, error = %e, "price feed parse error");
                SourceResult::unavailable(self.source_id, &key, now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{"prices": {"coffee": 4.20, "cocoa": 3.10}}"#;

    #[tokio::test]
    async fn extracts_requested_product() {
        let a = CommodityPriceAdapter::from_fixture("african-exchange-feed", FEED);
        let r = a.fetch(&Query::sourcing_price("coffee")).await;
        assert!(r.is_available());
        let p = r.payload.unwrap();
        assert_eq!(p["usd_per_kg"].as_f64(), Some(4.20));
    }

    #[tokio::test]
    async fn unknown_product_is_unavailable() {
        let a = CommodityPriceAdapter::from_fixture("african-exchange-feed", FEED);
        let r = a.fetch(&Query::sourcing_price("vanilla")).await;
        assert!(!r.is_available());
    }

    #[tokio::test]
    async fn malformed_feed_is_unavailable_not_panic() {
        let a = CommodityPriceAdapter::from_fixture("african-exchange-feed", "not json");
        let r = a.fetch(&Query::sourcing_price("coffee")).await;
        assert!(!r.is_available());
    }
}
