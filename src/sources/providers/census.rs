// src/sources/providers/census.rs
//
// US Census International Trade API adapter. The API answers with a
// row-oriented JSON array where the first row is the header:
//
//   [["CTY_CODE","CTY_NAME","GEN_VAL_MO","I_COMMODITY"],
//    ["7490","GHANA","15000000","0901"], ...]
//
// The adapter reshapes rows into objects keyed by the header names.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::sources::types::{Query, SourceAdapter, SourceResult};
use crate::sources::{get_text_with_retry, now_unix, DEFAULT_FETCH_TIMEOUT};

const SOURCE_ID: &str = "census-trade-api";

pub struct CensusTradeAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl CensusTradeAdapter {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(base_url: &str) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.to_string(),
                client: reqwest::Client::new(),
                timeout: DEFAULT_FETCH_TIMEOUT,
            },
        }
    }

    fn parse_rows(body: &str, hs_code: &str) -> Result<Value> {
        let rows: Vec<Vec<Value>> =
            serde_json::from_str(body).context("parsing census response rows")?;
        let mut iter = rows.into_iter();
        let header: Vec<String> = iter
            .next()
            .ok_or_else(|| anyhow!("census response has no header row"))?
            .into_iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect();

        let mut records = Vec::new();
        for row in iter {
            let mut obj = serde_json::Map::new();
            for (name, cell) in header.iter().zip(row.into_iter()) {
                obj.insert(name.clone(), cell);
            }
            records.push(Value::Object(obj));
        }

        Ok(json!({ "hs_code": hs_code, "records": records }))
    }
}

#[async_trait]
impl SourceAdapter for CensusTradeAdapter {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn fetch(&self, query: &Query) -> SourceResult {
        let key = query.key();
        let now = now_unix();

        let hs_code = match query.param.as_deref() {
            Some(c) => c,
            None => {
                tracing::warn!(source = SOURCE_ID, "trade flow query without HS code");
                return SourceResult::unavailable(SOURCE_ID, &key, now);
            }
        };

        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http {
                base_url,
                client,
                timeout,
            } => {
                let url = format!(
                    "{base_url}?get=CTY_CODE,CTY_NAME,GEN_VAL_MO,I_COMMODITY&I_COMMODITY={hs_code}"
                );
                match get_text_with_retry(client, SOURCE_ID, &url, *timeout).await {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(source = SOURCE_ID, error = %e, "census api unavailable");
                        return SourceResult::unavailable(SOURCE_ID, &key, now);
                    }
                }
            }
        };

        match Self::parse_rows(&body, hs_code) {
            Ok(payload) => SourceResult::fresh(SOURCE_ID, &key, payload, now),
            Err(e) => {
                tracing::warn!(source = SOURCE_ID, error = %e, "census parse error");
                SourceResult::unavailable(SOURCE_ID, &key, now)
            }
        }
    }
}
