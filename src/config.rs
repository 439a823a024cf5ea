// src/config.rs
//
// Engine configuration. Loaded from TOML or JSON with an env-var path
// override; every field has a compiled-in default so the engine boots with
// no config file at all. Validation failures are fatal at startup — the
// one error class this crate is allowed to abort on.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid engine config: {0}")]
    Invalid(String),
    #[error("rubric '{rubric}' weights sum to {sum}, expected 100")]
    RubricWeights { rubric: String, sum: u32 },
}

/// Per-query-kind TTLs in seconds. Distinct sources have distinct
/// volatility; they never share one global TTL.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub sourcing_price: u64,
    pub reference_price: u64,
    pub exchange_rates: u64,
    pub trade_flows: u64,
    pub trade_news: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            sourcing_price: 1_800,  // 30 min
            reference_price: 1_800, // 30 min
            exchange_rates: 3_600,  // 60 min
            trade_flows: 21_600,    // 6 h
            trade_news: 3_600,      // 60 min
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum margin for an opportunity to be reported, in percent.
    pub min_margin_pct: f64,
    pub top_n: usize,
    /// How long an Unavailable result shields a failing source.
    pub negative_ttl_secs: u64,
    pub max_concurrent_fetches: usize,
    /// Whole-resolve budget per query.
    pub resolve_budget_secs: u64,
    /// refresh_all re-fetches entries expiring within this horizon.
    pub refresh_horizon_secs: u64,
    /// Background refresh cadence.
    pub refresh_interval_secs: u64,
    pub ttl_secs: TtlConfig,
    /// Products scanned for arbitrage on every pass.
    pub tracked_products: Vec<String>,
    /// Monthly volume estimates in metric tons, per product.
    pub volume_estimates_tons: HashMap<String, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_margin_pct: 20.0,
            top_n: 10,
            negative_ttl_secs: 60,
            max_concurrent_fetches: 8,
            resolve_budget_secs: 15,
            refresh_horizon_secs: 900,
            refresh_interval_secs: 3_600,
            ttl_secs: TtlConfig::default(),
            tracked_products: vec![
                "coffee".into(),
                "cocoa".into(),
                "cashews".into(),
                "shea_butter".into(),
                "vanilla".into(),
            ],
            volume_estimates_tons: HashMap::from([
                ("coffee".to_string(), 75.0),
                ("cocoa".to_string(), 60.0),
                ("cashews".to_string(), 40.0),
                ("shea_butter".to_string(), 25.0),
                ("vanilla".to_string(), 8.0),
            ]),
        }
    }
}

impl EngineConfig {
    /// Load using env var + fallbacks:
    /// 1) $ENGINE_CONFIG_PATH
    /// 2) config/engine.toml
    /// 3) config/engine.json
    /// 4) compiled-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/engine.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/engine.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: Self = if ext == "json" {
            serde_json::from_str(&content).context("parsing engine config json")?
        } else {
            toml::from_str(&content).context("parsing engine config toml")?
        };
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.min_margin_pct.is_finite() {
            return Err(ConfigurationError::Invalid(
                "min_margin_pct must be finite".into(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigurationError::Invalid(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }
        if self.resolve_budget_secs == 0 {
            // A zero budget would time out every resolve before the first
            // fetch, silently degrading all answers to stale/unavailable.
            return Err(ConfigurationError::Invalid(
                "resolve_budget_secs must be positive".into(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "refresh_interval_secs must be positive".into(),
            ));
        }
        if self.tracked_products.is_empty() {
            return Err(ConfigurationError::Invalid(
                "tracked_products must not be empty".into(),
            ));
        }
        for (name, ttl) in [
            ("sourcing_price", self.ttl_secs.sourcing_price),
            ("reference_price", self.ttl_secs.reference_price),
            ("exchange_rates", self.ttl_secs.exchange_rates),
            ("trade_flows", self.ttl_secs.trade_flows),
            ("trade_news", self.ttl_secs.trade_news),
        ] {
            if ttl == 0 {
                return Err(ConfigurationError::Invalid(format!(
                    "ttl_secs.{name} must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Volume estimate for a product; unknown products get a conservative
    /// default so a config gap never drops an opportunity entirely.
    pub fn volume_estimate(&self, product: &str) -> f64 {
        self.volume_estimates_tons
            .get(product)
            .copied()
            .unwrap_or(10.0)
    }
}
