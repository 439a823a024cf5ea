//! Weighted entity-quality scoring for suppliers and buyers.
//!
//! Each rubric is a fixed set of weighted criteria; weights must sum to
//! exactly 100 (checked at construction, a violation is a configuration
//! error). Raw criterion values are normalized to [0,100] by a
//! criterion-specific map, and the total is the plain weighted sum —
//! recomputed in full on every call, never incrementally.
//!
//! Normalization choices (the upstream business material never pinned
//! these down, so they are fixed here):
//! - certifications: 25 points per recognized certification, capped at 100
//! - financial stability: linear in years in business, 20 years -> 100
//! - production capacity: bucketed annual tonnage
//!   (<10 -> 20, <100 -> 40, <500 -> 60, <1000 -> 80, else 100)
//! - export experience: linear in years exporting, 10 years -> 100
//! - responsiveness: inverse linear on avg response hours (<=4h -> 100,
//!   >=48h -> 0)
//! - sustainability / specialty focus: boolean -> {0, 100}
//! - pricing: linear in discount vs reference price, 30% -> 100
//! - purchase volume: bucketed annual tons (<50 -> 20, <250 -> 40,
//!   <1000 -> 60, <5000 -> 80, else 100)
//! - payment reliability: on-time rate [0,1] -> [0,100]
//! - market reach: linear in states covered, 25 -> 100
//! - growth trajectory: linear in YoY growth, 0% -> 0, 40%+ -> 100

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigurationError;

/// Certifications that earn normalization points.
const RECOGNIZED_CERTIFICATIONS: &[&str] = &[
    "organic",
    "fair trade",
    "fairtrade",
    "rainforest alliance",
    "utz",
    "global gap",
    "haccp",
    "iso 22000",
    "kosher",
    "halal",
];

#[derive(Debug, Clone, Copy)]
pub struct RubricEntry {
    pub name: &'static str,
    pub weight: u32,
    pub normalize: fn(f64) -> f64,
}

/// A validated set of weighted criteria.
#[derive(Debug, Clone)]
pub struct Rubric {
    name: &'static str,
    entries: Vec<RubricEntry>,
}

impl Rubric {
    pub fn new(name: &'static str, entries: Vec<RubricEntry>) -> Result<Self, ConfigurationError> {
        let sum: u32 = entries.iter().map(|e| e.weight).sum();
        if sum != 100 {
            return Err(ConfigurationError::RubricWeights {
                rubric: name.to_string(),
                sum,
            });
        }
        Ok(Self { name, entries })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn weight_sum(&self) -> u32 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Supplier quality rubric: certifications 25, financial stability 20,
    /// production capacity 15, export experience 15, responsiveness 10,
    /// sustainability 10, pricing 5.
    pub fn supplier() -> Result<Self, ConfigurationError> {
        Self::new(
            "supplier",
            vec![
                RubricEntry {
                    name: "certifications",
                    weight: 25,
                    normalize: |n| clamp100(n * 25.0),
                },
                RubricEntry {
                    name: "financial_stability",
                    weight: 20,
                    normalize: |years| linear(years, 20.0),
                },
                RubricEntry {
                    name: "production_capacity",
                    weight: 15,
                    normalize: capacity_bucket,
                },
                RubricEntry {
                    name: "export_experience",
                    weight: 15,
                    normalize: |years| linear(years, 10.0),
                },
                RubricEntry {
                    name: "responsiveness",
                    weight: 10,
                    normalize: response_hours,
                },
                RubricEntry {
                    name: "sustainability",
                    weight: 10,
                    normalize: boolean,
                },
                RubricEntry {
                    name: "pricing",
                    weight: 5,
                    normalize: |discount_pct| linear(discount_pct, 30.0),
                },
            ],
        )
    }

    /// Buyer quality rubric: purchase volume 30, payment reliability 25,
    /// market reach 15, growth trajectory 10, specialty focus 10,
    /// responsiveness 10.
    pub fn buyer() -> Result<Self, ConfigurationError> {
        Self::new(
            "buyer",
            vec![
                RubricEntry {
                    name: "purchase_volume",
                    weight: 30,
                    normalize: volume_bucket,
                },
                RubricEntry {
                    name: "payment_reliability",
                    weight: 25,
                    normalize: |rate| clamp100(rate * 100.0),
                },
                RubricEntry {
                    name: "market_reach",
                    weight: 15,
                    normalize: |states| linear(states, 25.0),
                },
                RubricEntry {
                    name: "growth_trajectory",
                    weight: 10,
                    normalize: |yoy_pct| linear(yoy_pct, 40.0),
                },
                RubricEntry {
                    name: "specialty_focus",
                    weight: 10,
                    normalize: boolean,
                },
                RubricEntry {
                    name: "responsiveness",
                    weight: 10,
                    normalize: response_hours,
                },
            ],
        )
    }

    /// Score raw criterion values. Criteria missing from `raws` count as
    /// raw 0. Total is bounded to [0,100] by construction.
    pub fn score(&self, entity_id: &str, raws: &BTreeMap<&'static str, f64>) -> EntityScore {
        let mut criteria = BTreeMap::new();
        let mut total = 0.0f64;
        for entry in &self.entries {
            let raw = raws.get(entry.name).copied().unwrap_or(0.0);
            let normalized = clamp100((entry.normalize)(raw));
            total += normalized * entry.weight as f64 / 100.0;
            criteria.insert(
                entry.name.to_string(),
                CriterionScore {
                    weight: entry.weight,
                    raw_value: raw,
                    normalized,
                },
            );
        }
        EntityScore {
            entity_id: entity_id.to_string(),
            criteria,
            total_score: clamp100(total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub weight: u32,
    pub raw_value: f64,
    /// Normalized to [0,100].
    pub normalized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScore {
    pub entity_id: String,
    pub criteria: BTreeMap<String, CriterionScore>,
    /// Weighted sum, bounded to [0,100].
    pub total_score: f64,
}

/// Raw supplier facts as collected by the (external) CRM layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub supplier_id: String,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub years_in_business: u32,
    #[serde(default)]
    pub annual_capacity_tons: f64,
    #[serde(default)]
    pub years_exporting: u32,
    #[serde(default)]
    pub avg_response_hours: f64,
    #[serde(default)]
    pub sustainability_program: bool,
    /// Discount of the supplier's FOB price vs the reference market, in
    /// percent. Negative when the supplier is more expensive.
    #[serde(default)]
    pub price_discount_pct: f64,
}

impl SupplierProfile {
    pub fn raw_criteria(&self) -> BTreeMap<&'static str, f64> {
        let certs = self
            .certifications
            .iter()
            .filter(|c| {
                let c = c.trim().to_ascii_lowercase();
                RECOGNIZED_CERTIFICATIONS.contains(&c.as_str())
            })
            .count() as f64;
        BTreeMap::from([
            ("certifications", certs),
            ("financial_stability", self.years_in_business as f64),
            ("production_capacity", self.annual_capacity_tons),
            ("export_experience", self.years_exporting as f64),
            ("responsiveness", self.avg_response_hours),
            (
                "sustainability",
                if self.sustainability_program { 1.0 } else { 0.0 },
            ),
            ("pricing", self.price_discount_pct),
        ])
    }
}

/// Raw buyer facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub buyer_id: String,
    #[serde(default)]
    pub annual_purchase_volume_tons: f64,
    /// Share of invoices paid on time, in [0,1].
    #[serde(default)]
    pub on_time_payment_rate: f64,
    #[serde(default)]
    pub distribution_states: u32,
    #[serde(default)]
    pub yoy_growth_pct: f64,
    #[serde(default)]
    pub specialty_focus: bool,
    #[serde(default)]
    pub avg_response_hours: f64,
}

impl BuyerProfile {
    pub fn raw_criteria(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("purchase_volume", self.annual_purchase_volume_tons),
            ("payment_reliability", self.on_time_payment_rate),
            ("market_reach", self.distribution_states as f64),
            ("growth_trajectory", self.yoy_growth_pct),
            (
                "specialty_focus",
                if self.specialty_focus { 1.0 } else { 0.0 },
            ),
            ("responsiveness", self.avg_response_hours),
        ])
    }
}

fn clamp100(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 100.0)
}

/// Linear map: 0 -> 0, `full` -> 100, clamped.
fn linear(x: f64, full: f64) -> f64 {
    clamp100(x / full * 100.0)
}

fn boolean(x: f64) -> f64 {
    if x > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Inverse linear on average response time: <=4h -> 100, >=48h -> 0.
fn response_hours(hours: f64) -> f64 {
    if hours <= 4.0 {
        return 100.0;
    }
    if hours >= 48.0 {
        return 0.0;
    }
    clamp100((48.0 - hours) / (48.0 - 4.0) * 100.0)
}

fn capacity_bucket(tons: f64) -> f64 {
    match tons {
        t if t < 10.0 => 20.0,
        t if t < 100.0 => 40.0,
        t if t < 500.0 => 60.0,
        t if t < 1000.0 => 80.0,
        _ => 100.0,
    }
}

fn volume_bucket(tons: f64) -> f64 {
    match tons {
        t if t < 50.0 => 20.0,
        t if t < 250.0 => 40.0,
        t if t < 1000.0 => 60.0,
        t if t < 5000.0 => 80.0,
        _ => 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_supplier() -> SupplierProfile {
        SupplierProfile {
            supplier_id: "sidamo-coop".into(),
            certifications: vec!["Organic".into(), "Fair Trade".into()],
            years_in_business: 12,
            annual_capacity_tons: 600.0,
            years_exporting: 8,
            avg_response_hours: 6.0,
            sustainability_program: true,
            price_discount_pct: 25.0,
        }
    }

    #[test]
    fn rubric_weights_sum_to_100() {
        assert_eq!(Rubric::supplier().unwrap().weight_sum(), 100);
        assert_eq!(Rubric::buyer().unwrap().weight_sum(), 100);
    }

    #[test]
    fn bad_weights_are_a_configuration_error() {
        let err = Rubric::new(
            "broken",
            vec![RubricEntry {
                name: "only",
                weight: 40,
                normalize: boolean,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::RubricWeights { sum: 40, .. }));
    }

    #[test]
    fn total_score_is_bounded() {
        let rubric = Rubric::supplier().unwrap();
        let score = rubric.score("s1", &strong_supplier().raw_criteria());
        assert!(score.total_score >= 0.0 && score.total_score <= 100.0);
        for c in score.criteria.values() {
            assert!(c.normalized >= 0.0 && c.normalized <= 100.0);
        }
    }

    #[test]
    fn empty_profile_scores_zeroish() {
        let rubric = Rubric::buyer().unwrap();
        let profile = BuyerProfile {
            buyer_id: "b0".into(),
            annual_purchase_volume_tons: 0.0,
            on_time_payment_rate: 0.0,
            distribution_states: 0,
            yoy_growth_pct: 0.0,
            specialty_focus: false,
            avg_response_hours: 72.0,
        };
        let score = rubric.score("b0", &profile.raw_criteria());
        // Volume bucket floors at 20 even for tiny buyers.
        assert!((score.total_score - 6.0).abs() < 1e-9);
    }

    #[test]
    fn certification_points_cap_at_four() {
        let mut p = strong_supplier();
        p.certifications = vec![
            "organic".into(),
            "fairtrade".into(),
            "kosher".into(),
            "halal".into(),
            "haccp".into(),
        ];
        let raws = p.raw_criteria();
        let rubric = Rubric::supplier().unwrap();
        let score = rubric.score("s1", &raws);
        assert_eq!(score.criteria["certifications"].normalized, 100.0);
    }

    #[test]
    fn unrecognized_certifications_do_not_count() {
        let mut p = strong_supplier();
        p.certifications = vec!["Best Beans 2024 Award".into()];
        assert_eq!(p.raw_criteria()["certifications"], 0.0);
    }

    #[test]
    fn responsiveness_is_inverse() {
        assert_eq!(response_hours(2.0), 100.0);
        assert_eq!(response_hours(48.0), 0.0);
        let mid = response_hours(26.0);
        assert!(mid > 0.0 && mid < 100.0);
    }

    #[test]
    fn weighted_sum_matches_hand_computation() {
        let rubric = Rubric::supplier().unwrap();
        let score = rubric.score("s1", &strong_supplier().raw_criteria());
        let expected: f64 = score
            .criteria
            .values()
            .map(|c| c.normalized * c.weight as f64 / 100.0)
            .sum();
        assert!((score.total_score - expected).abs() < 1e-9);
    }
}
