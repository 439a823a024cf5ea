// src/sources/providers/fx.rs
//
// Currency feed adapter. Keeps the full USD rate table as the payload;
// African currencies (ETB, GHS, KES, NGN, ...) are looked up downstream.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::sources::types::{Query, SourceAdapter, SourceResult};
use crate::sources::{get_text_with_retry, now_unix, DEFAULT_FETCH_TIMEOUT};

const SOURCE_ID: &str = "fx-rates-feed";

#[derive(Debug, Deserialize)]
struct RateFeed {
    rates: HashMap<String, f64>,
}

pub struct ExchangeRateAdapter {
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

impl ExchangeRateAdapter {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(url: &str) -> Self {
        Self {
            mode: Mode::Http {
                url: url.to_string(),
                client: reqwest::Client::new(),
                timeout: DEFAULT_FETCH_TIMEOUT,
            },
        }
    }

    fn parse(body: &str) -> Result<serde_json::Value> {
        let feed: RateFeed = serde_json::from_str(body).context("parsing fx rate feed")?;
        Ok(json!({ "base": "USD", "rates": feed.rates }))
    }
}

#[async_trait]
impl SourceAdapter for ExchangeRateAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch(&self, query: &Query) -> SourceResult {
        let key = query.key();
        let now = now_unix();

        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http {
                url,
                client,
                timeout,
            } => match get_text_with_retry(client, SOURCE_ID, url, *timeout).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(source = SOURCE_ID, error = %e, "fx feed unavailable");
                    return SourceResult::unavailable(SOURCE_ID, &key, now);
                }
            },
        };

        match Self::parse(&body) {
            Ok(payload) => SourceResult::fresh(SOURCE_ID, &key, payload, now),
            Err(e) => {
                tracing::warn!(source = SOURCE_ID, error = %e, "fx feed parse error");
                SourceResult::unavailable(SOURCE_ID, &key, now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_rate_table() {
        let a = ExchangeRateAdapter::from_fixture(
            r#"{"rates": {"ETB": 57.45, "GHS": 15.82, "KES": 143.25}}"#,
        );
        let r = a.fetch(&Query::exchange_rates()).await;
        assert!(r.is_available());
        let p = r.payload.unwrap();
        assert_eq!(p["rates"]["GHS"].as_f64(), Some(15.82));
    }
}
