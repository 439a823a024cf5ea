// src/sources/providers/news.rs
//
// Trade news RSS adapter (quick-xml deserialization, RFC 2822 pubDates).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::json;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::sources::types::{Query, SourceAdapter, SourceResult};
use crate::sources::{get_text_with_retry, normalize_text, now_unix, DEFAULT_FETCH_TIMEOUT};

const SOURCE_ID: &str = "trade-news-rss";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

pub struct TradeNewsAdapter {
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

impl TradeNewsAdapter {
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

    fn parse_items(body: &str) -> Result<serde_json::Value> {
        let xml_clean = scrub_html_entities_for_xml(body);
        let rss: Rss = from_str(&xml_clean).context("parsing trade news rss xml")?;

        let mut items = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let summary = normalize_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() && summary.is_empty() {
                continue;
            }
            items.push(json!({
                "title": title,
                "summary": summary,
                "link": it.link,
                "published_at": it.pub_date.as_deref().map(parse_rfc2822_to_unix).unwrap_or(0),
            }));
        }

        Ok(json!({ "items": items }))
    }
}

#[async_trait]
impl SourceAdapter for TradeNewsAdapter {
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
                    tracing::warn!(source = SOURCE_ID, error = %e, "news feed unavailable");
                    return SourceResult::unavailable(SOURCE_ID, &key, now);
                }
            },
        };

        match Self::parse_items(&body) {
            Ok(payload) => SourceResult::fresh(SOURCE_ID, &key, payload, now),
            Err(e) => {
                tracing::warn!(source = SOURCE_ID, error = %e, "news feed parse error");
                SourceResult::unavailable(SOURCE_ID, &key, now)
            }
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
