// src/api.rs
//
// HTTP surface consumed by the (out-of-scope) dashboard and scheduling
// layers. Thin JSON adapters over the engine; no business logic lives here.

use std::sync::Arc;

use axum::{
    extract::{Query as QueryParams, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::{IntelligenceEngine, MarketSnapshot};
use crate::scoring::arbitrage::ArbitrageOpportunity;
use crate::scoring::entity::{BuyerProfile, EntityScore, SupplierProfile};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<IntelligenceEngine>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/opportunities", get(opportunities))
        .route("/suppliers/score", post(score_supplier))
        .route("/buyers/score", post(score_buyer))
        .route("/market/snapshot", get(market_snapshot))
        .route("/refresh", post(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct OpportunityParams {
    /// Override of the configured minimum margin, in percent.
    #[serde(default)]
    min_margin: Option<f64>,
    #[serde(default)]
    top_n: Option<usize>,
}

async fn opportunities(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<OpportunityParams>,
) -> Json<Vec<ArbitrageOpportunity>> {
    let ranked = state
        .engine
        .scan_opportunities(params.min_margin, params.top_n)
        .await;
    Json(ranked)
}

async fn score_supplier(
    State(state): State<AppState>,
    Json(profile): Json<SupplierProfile>,
) -> Json<EntityScore> {
    Json(state.engine.score_supplier(&profile))
}

async fn score_buyer(
    State(state): State<AppState>,
    Json(profile): Json<BuyerProfile>,
) -> Json<EntityScore> {
    Json(state.engine.score_buyer(&profile))
}

async fn market_snapshot(State(state): State<AppState>) -> Json<MarketSnapshot> {
    Json(state.engine.market_snapshot().await)
}

#[derive(Serialize)]
struct RefreshResp {
    refreshed: usize,
}

async fn refresh(State(state): State<AppState>) -> Json<RefreshResp> {
    let refreshed = state.engine.refresh_all().await;
    Json(RefreshResp { refreshed })
}
