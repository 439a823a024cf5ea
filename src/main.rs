//! Trade Intelligence Engine — Binary Entrypoint
//! Boots the Axum HTTP server: engine state, routes, metrics, and the
//! background refresh scheduler.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trade_intelligence::api::{create_router, AppState};
use trade_intelligence::config::EngineConfig;
use trade_intelligence::engine::IntelligenceEngine;
use trade_intelligence::metrics::Metrics;
use trade_intelligence::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ENGINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ENGINE_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trade_intelligence=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables
    // ENGINE_CONFIG_PATH from .env so config.rs can pick it up.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    // Configuration problems are the one thing allowed to abort startup.
    let config = EngineConfig::load_default().expect("failed to load engine config");
    let metrics = Metrics::init(&config);
    let refresh_interval = config.refresh_interval_secs;

    let engine = Arc::new(
        IntelligenceEngine::with_default_sources(config).expect("invalid engine configuration"),
    );

    spawn_refresh_scheduler(
        Arc::clone(&engine),
        RefreshSchedulerCfg {
            interval_secs: refresh_interval,
        },
    );

    let router = create_router(AppState { engine }).merge(metrics.router());

    Ok(router.into())
}
