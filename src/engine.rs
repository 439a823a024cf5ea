//! # Intelligence Engine
//! Facade tying the cache, aggregator, and scoring together. Owns the one
//! shared `TtlCache` instance and the validated rubrics; everything it
//! returns is recomputed from current cache contents, never persisted
//! derived state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::aggregator::{Aggregator, SourceRoute};
use crate::cache::TtlCache;
use crate::config::{ConfigurationError, EngineConfig};
use crate::ranker;
use crate::scoring::arbitrage::{self, ArbitrageOpportunity, PriceQuote};
use crate::scoring::entity::{BuyerProfile, EntityScore, Rubric, SupplierProfile};
use crate::sources::providers::{
    CensusTradeAdapter, CommodityPriceAdapter, ExchangeRateAdapter, TradeNewsAdapter,
};
use crate::sources::types::{Query, QueryKind, SourceAdapter};

// Default upstream endpoints; a deployment overrides them by wiring its own
// routes through `IntelligenceEngine::new`.
const AFRICAN_EXCHANGE_URL: &str = "https://api.africacommoditiesindex.org/v1/prices";
const WORLD_BANK_PINKSHEET_URL: &str =
    "https://api.worldbank.org/v2/commodities/prices?format=json";
const US_WHOLESALE_URL: &str = "https://marketnews.usda.gov/api/v1/wholesale/prices";
const US_WHOLESALE_BACKUP_URL: &str = "https://api.commoditypriceapi.com/v1/latest?base=USD";
const FX_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";
const CENSUS_TRADE_URL: &str = "https://api.census.gov/data/timeseries/intltrade/imports/hs";
const TRADE_NEWS_URL: &str = "https://news.google.com/rss/search?q=africa+usa+agricultural+trade";

/// Merged market view for the (external) dashboard layer.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub exchange_rates: Option<serde_json::Value>,
    pub news: Option<serde_json::Value>,
    pub generated_at: u64,
}

pub struct IntelligenceEngine {
    config: EngineConfig,
    aggregator: Arc<Aggregator>,
    supplier_rubric: Rubric,
    buyer_rubric: Rubric,
}

impl IntelligenceEngine {
    /// Build with explicit routes (tests inject stub adapters here).
    pub fn new(
        config: EngineConfig,
        routes: HashMap<QueryKind, SourceRoute>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let cache = Arc::new(TtlCache::new(config.negative_ttl_secs));
        let aggregator = Arc::new(Aggregator::new(cache, routes, config.max_concurrent_fetches));
        Ok(Self {
            aggregator,
            supplier_rubric: Rubric::supplier()?,
            buyer_rubric: Rubric::buyer()?,
            config,
        })
    }

    /// Build against the default public HTTP sources.
    pub fn with_default_sources(config: EngineConfig) -> Result<Self, ConfigurationError> {
        let ttl = &config.ttl_secs;
        let routes = HashMap::from([
            (
                QueryKind::SourcingPrice,
                SourceRoute {
                    ttl_secs: ttl.sourcing_price,
                    adapters: vec![
                        Arc::new(CommodityPriceAdapter::from_url(
                            "african-exchange-feed",
                            AFRICAN_EXCHANGE_URL,
                        )) as Arc<dyn SourceAdapter>,
                        Arc::new(CommodityPriceAdapter::from_url(
                            "world-bank-pinksheet",
                            WORLD_BANK_PINKSHEET_URL,
                        )),
                    ],
                },
            ),
            (
                QueryKind::ReferencePrice,
                SourceRoute {
                    ttl_secs: ttl.reference_price,
                    adapters: vec![
                        Arc::new(CommodityPriceAdapter::from_url(
                            "us-wholesale-feed",
                            US_WHOLESALE_URL,
                        )) as Arc<dyn SourceAdapter>,
                        Arc::new(CommodityPriceAdapter::from_url(
                            "commodity-price-api",
                            US_WHOLESALE_BACKUP_URL,
                        )),
                    ],
                },
            ),
            (
                QueryKind::ExchangeRates,
                SourceRoute {
                    ttl_secs: ttl.exchange_rates,
                    adapters: vec![Arc::new(ExchangeRateAdapter::from_url(FX_RATES_URL))
                        as Arc<dyn SourceAdapter>],
                },
            ),
            (
                QueryKind::TradeFlows,
                SourceRoute {
                    ttl_secs: ttl.trade_flows,
                    adapters: vec![Arc::new(CensusTradeAdapter::from_url(CENSUS_TRADE_URL))
                        as Arc<dyn SourceAdapter>],
                },
            ),
            (
                QueryKind::TradeNews,
                SourceRoute {
                    ttl_secs: ttl.trade_news,
                    adapters: vec![Arc::new(TradeNewsAdapter::from_url(TRADE_NEWS_URL))
                        as Arc<dyn SourceAdapter>],
                },
            ),
        ]);
        Self::new(config, routes)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(self.config.resolve_budget_secs)
    }

    /// Resolve sourcing and reference prices for every tracked product,
    /// compute margins, and rank. Products whose prices are unavailable
    /// are silently skipped — a short list is an answer, not an error.
    pub async fn scan_opportunities(
        &self,
        min_margin: Option<f64>,
        top_n: Option<usize>,
    ) -> Vec<ArbitrageOpportunity> {
        let min_margin = min_margin.unwrap_or(self.config.min_margin_pct);
        let top_n = top_n.unwrap_or(self.config.top_n);
        let now = self.aggregator.cache().now();

        let mut computed = Vec::with_capacity(self.config.tracked_products.len());
        for product in &self.config.tracked_products {
            let sourcing_query = Query::sourcing_price(product);
            let reference_query = Query::reference_price(product);
            let (sourcing, reference) = tokio::join!(
                self.aggregator
                    .resolve_with_timeout(&sourcing_query, self.budget()),
                self.aggregator
                    .resolve_with_timeout(&reference_query, self.budget()),
            );

            let outcome = arbitrage::evaluate(
                product,
                PriceQuote::from_result(&sourcing),
                PriceQuote::from_result(&reference),
                self.config.volume_estimate(product),
                now,
            );
            match outcome.into_opportunity() {
                Some(opp) => computed.push(opp),
                None => {
                    tracing::debug!(product = %product, "insufficient price data, skipping product");
                }
            }
        }

        ranker::rank(computed, min_margin, top_n)
    }

    pub fn score_supplier(&self, profile: &SupplierProfile) -> EntityScore {
        self.supplier_rubric
            .score(&profile.supplier_id, &profile.raw_criteria())
    }

    pub fn score_buyer(&self, profile: &BuyerProfile) -> EntityScore {
        self.buyer_rubric
            .score(&profile.buyer_id, &profile.raw_criteria())
    }

    /// Rank pre-scored entities; thin passthrough kept here so callers
    /// never touch ranker internals.
    pub fn rank_entities(
        &self,
        scores: Vec<EntityScore>,
        min_score: f64,
        top_n: usize,
    ) -> Vec<EntityScore> {
        ranker::rank_entities(scores, min_score, top_n)
    }

    /// Proactively re-fetch tracked queries nearing expiry. Invoked by the
    /// background scheduler (and exposed over HTTP for external cron).
    pub async fn refresh_all(&self) -> usize {
        self.aggregator
            .refresh_all(self.config.refresh_horizon_secs)
            .await
    }

    /// Merged view of opportunities, FX, and news for the dashboard.
    pub async fn market_snapshot(&self) -> MarketSnapshot {
        let opportunities = self.scan_opportunities(None, None).await;
        let fx = self
            .aggregator
            .resolve_with_timeout(&Query::exchange_rates(), self.budget())
            .await;
        let news = self
            .aggregator
            .resolve_with_timeout(&Query::trade_news(), self.budget())
            .await;

        MarketSnapshot {
            opportunities,
            exchange_rates: fx.payload,
            news: news.payload,
            generated_at: self.aggregator.cache().now(),
        }
    }
}
