//! Arbitrage margin scoring.
//!
//! `margin_pct = (reference_price - source_price) / source_price * 100`,
//! defined only for a positive source price. A margin is computed only when
//! both price inputs are actually available (Fresh or Stale); anything less
//! yields `InsufficientData` rather than a misleading number. The minimum
//! margin threshold is a ranker-side filter, never part of the computation.

use serde::{Deserialize, Serialize};

use crate::sources::types::{SourceResult, SourceStatus};

/// A price observation carried into scoring with its freshness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub price_usd: f64,
    pub status: SourceStatus,
}

impl PriceQuote {
    /// Extract a `usd_per_kg` quote from a resolved price query.
    /// Unavailable results and payloads without a finite price yield `None`.
    pub fn from_result(result: &SourceResult) -> Option<Self> {
        if !result.is_available() {
            return None;
        }
        let price = result.payload.as_ref()?.get("usd_per_kg")?.as_f64()?;
        if !price.is_finite() {
            return None;
        }
        Some(Self {
            price_usd: price,
            status: result.status,
        })
    }
}

/// Derived, read-only record; recomputed whenever price data refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub product_id: String,
    pub source_price: f64,
    pub reference_price: f64,
    pub margin_pct: f64,
    /// Monthly volume estimate in metric tons.
    pub volume_estimate: f64,
    pub computed_at: u64,
}

/// Outcome of a margin evaluation. `InsufficientData` is data, not an
/// error: a shorter opportunity list is correct behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum MarginOutcome {
    Opportunity(ArbitrageOpportunity),
    InsufficientData,
}

impl MarginOutcome {
    pub fn into_opportunity(self) -> Option<ArbitrageOpportunity> {
        match self {
            MarginOutcome::Opportunity(o) => Some(o),
            MarginOutcome::InsufficientData => None,
        }
    }
}

/// Raw margin formula. `None` when `source_price <= 0` or inputs are not
/// finite.
pub fn margin_pct(source_price: f64, reference_price: f64) -> Option<f64> {
    if !(source_price.is_finite() && reference_price.is_finite()) || source_price <= 0.0 {
        return None;
    }
    Some((reference_price - source_price) / source_price * 100.0)
}

/// Evaluate one product's sourcing vs reference quote pair.
pub fn evaluate(
    product_id: &str,
    source: Option<PriceQuote>,
    reference: Option<PriceQuote>,
    volume_estimate: f64,
    computed_at: u64,
) -> MarginOutcome {
    let (source, reference) = match (source, reference) {
        (Some(s), Some(r)) => (s, r),
        _ => return MarginOutcome::InsufficientData,
    };
    // `PriceQuote::from_result` already rejects Unavailable; this guards
    // callers that build quotes by hand.
    if source.status == SourceStatus::Unavailable || reference.status == SourceStatus::Unavailable {
        return MarginOutcome::InsufficientData;
    }

    match margin_pct(source.price_usd, reference.price_usd) {
        Some(margin) => MarginOutcome::Opportunity(ArbitrageOpportunity {
            product_id: product_id.to_string(),
            source_price: source.price_usd,
            reference_price: reference.price_usd,
            margin_pct: margin,
            volume_estimate,
            computed_at,
        }),
        None => MarginOutcome::InsufficientData,
    }
}
