// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod ranker;
pub mod scheduler;
pub mod scoring;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{Aggregator, SourceRoute};
pub use crate::api::{create_router, AppState};
pub use crate::cache::TtlCache;
pub use crate::config::{ConfigurationError, EngineConfig};
pub use crate::engine::{IntelligenceEngine, MarketSnapshot};
pub use crate::ranker::{rank, rank_entities};
pub use crate::scoring::{
    ArbitrageOpportunity, BuyerProfile, EntityScore, MarginOutcome, PriceQuote, Rubric,
    SupplierProfile,
};
pub use crate::sources::types::{
    Query, QueryKind, SourceAdapter, SourceResult, SourceStatus,
};
