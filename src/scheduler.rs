// src/scheduler.rs
//
// Background refresh loop. An external cron can also drive POST /refresh;
// this in-process task is the default so a standalone deployment keeps its
// cache warm without any outside help.

use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::task::JoinHandle;

use crate::engine::IntelligenceEngine;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn the periodic refresh task. The first tick fires immediately,
/// which doubles as a startup cache warm-up.
pub fn spawn_refresh_scheduler(
    engine: Arc<IntelligenceEngine>,
    cfg: RefreshSchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        loop {
            ticker.tick().await;
            let refreshed = engine.refresh_all().await;

            counter!("refresh_runs_total").increment(1);
            gauge!("refresh_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

            tracing::info!(
                target: "scheduler",
                refreshed,
                "scheduled refresh tick"
            );
        }
    })
}
