// src/metrics.rs
//
// Prometheus wiring. The recorder is installed once at startup; the moving
// series (cache hits, fallbacks, fetch latency) register themselves at
// their call sites, so this module only owns the exporter, the static
// config gauges, and the /metrics route.

use axum::{routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::EngineConfig;
use crate::sources::now_unix;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the recorder and publish the config values dashboards need
    /// for annotations (failure windows, the margin cut line).
    pub fn init(config: &EngineConfig) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_gauge!("engine_start_ts", "Unix ts when this process booted.");
        describe_gauge!(
            "cache_negative_ttl_secs",
            "How long Unavailable results shield a failing source."
        );
        describe_gauge!(
            "engine_min_margin_pct",
            "Configured minimum opportunity margin."
        );
        describe_gauge!(
            "engine_tracked_products",
            "Number of products scanned per arbitrage pass."
        );

        gauge!("engine_start_ts").set(now_unix() as f64);
        gauge!("cache_negative_ttl_secs").set(config.negative_ttl_secs as f64);
        gauge!("engine_min_margin_pct").set(config.min_margin_pct);
        gauge!("engine_tracked_products").set(config.tracked_products.len() as f64);

        Self { handle }
    }

    /// `/metrics` in Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
