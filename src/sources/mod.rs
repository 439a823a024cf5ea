// src/sources/mod.rs
pub mod providers;
pub mod types;

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::sources::types::FetchError;

/// Per-call timeout applied to every outbound request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// At most 2 retries after the initial attempt, on transient errors only.
const MAX_RETRIES: u32 = 2;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("source_fetch_total", "Outbound fetch attempts per source.");
        describe_counter!(
            "source_fetch_errors_total",
            "Fetch attempts that ended in a transient or permanent error."
        );
        describe_counter!(
            "source_fetch_retries_total",
            "Retries issued after transient errors."
        );
        describe_histogram!("source_fetch_ms", "Outbound fetch latency in milliseconds.");
    });
}

/// GET `url` and return the body, retrying transient failures with
/// exponential backoff (1s, 2s). Non-transient errors fail immediately.
pub(crate) async fn get_text_with_retry(
    client: &reqwest::Client,
    source_id: &'static str,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    retry_transient(source_id, || fetch_once(client, url, timeout)).await
}

/// Run `attempt_fn` up to `1 + MAX_RETRIES` times. Only transient errors
/// are retried; a permanent error or an exhausted budget returns the last
/// error as-is.
async fn retry_transient<T, F, Fut>(
    source_id: &'static str,
    mut attempt_fn: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    ensure_metrics_described();

    let mut attempt = 0u32;
    loop {
        counter!("source_fetch_total", "source" => source_id).increment(1);
        let t0 = std::time::Instant::now();

        let outcome = attempt_fn().await;
        histogram!("source_fetch_ms", "source" => source_id)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match outcome {
            Ok(body) => return Ok(body),
            Err(e) => {
                counter!("source_fetch_errors_total", "source" => source_id).increment(1);
                if !e.is_transient() || attempt >= MAX_RETRIES {
                    return Err(e);
                }
                let backoff = Duration::from_secs(1u64 << attempt);
                tracing::warn!(
                    source = source_id,
                    error = %e,
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    "transient fetch error, retrying"
                );
                counter!("source_fetch_retries_total", "source" => source_id).increment(1);
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::from_status(
            status.as_u16(),
            format!("GET {url}"),
        ));
    }

    resp.text().await.map_err(FetchError::from_reqwest)
}

/// Normalize news text: decode HTML entities, strip tags, collapse
/// whitespace, trim trailing punctuation, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // Length cap: 1000 chars
    if out.chars().count() > 1000 {
        out = out.chars().take(1000).collect();
    }

    out
}

pub fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Paused-time tests: the backoff sleeps auto-advance, so the retry
    // schedule runs instantly and deterministically.

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_twice_then_given_up() {
        let calls = AtomicUsize::new(0);
        let r: Result<String, _> = retry_transient("stub", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::from_status(503, "stub upstream".into())) }
        })
        .await;

        assert!(r.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3); // initial + 2 retries
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_fail_on_first_attempt() {
        let calls = AtomicUsize::new(0);
        let r: Result<String, _> = retry_transient("stub", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::from_status(404, "stub upstream".into())) }
        })
        .await;

        assert!(r.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_then_success_recovers() {
        let calls = AtomicUsize::new(0);
        let r = retry_transient("stub", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(FetchError::from_status(429, "stub upstream".into()))
                } else {
                    Ok("body".to_string())
                }
            }
        })
        .await;

        assert_eq!(r.unwrap(), "body");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Ethiopian&nbsp;coffee</b> exports rise!!!  ";
        assert_eq!(normalize_text(s), "Ethiopian coffee exports rise");
    }

    #[test]
    fn normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("a \n\t b"), "a b");
    }
}
