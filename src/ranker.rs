//! # Opportunity Ranker
//! Pure filter/sort/truncate over computed scores. No hidden state, so the
//! same inputs always produce the same ordering.
//!
//! Opportunity tie-break: margin desc, then volume estimate desc, then
//! product id asc. Entity tie-break: total score desc, then entity id asc.

use crate::scoring::arbitrage::ArbitrageOpportunity;
use crate::scoring::entity::EntityScore;

/// Keep opportunities with `margin_pct >= min_margin`, best first, at most
/// `top_n`. An output shorter than `top_n` — or empty — just means fewer
/// qualifying opportunities exist right now.
pub fn rank(
    mut opportunities: Vec<ArbitrageOpportunity>,
    min_margin: f64,
    top_n: usize,
) -> Vec<ArbitrageOpportunity> {
    opportunities.retain(|o| o.margin_pct >= min_margin);
    opportunities.sort_by(|a, b| {
        b.margin_pct
            .total_cmp(&a.margin_pct)
            .then(b.volume_estimate.total_cmp(&a.volume_estimate))
            .then(a.product_id.cmp(&b.product_id))
    });
    opportunities.truncate(top_n);
    opportunities
}

/// Same shape for entity scores: `total_score >= min_score`, best first.
pub fn rank_entities(
    mut scores: Vec<EntityScore>,
    min_score: f64,
    top_n: usize,
) -> Vec<EntityScore> {
    scores.retain(|s| s.total_score >= min_score);
    scores.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then(a.entity_id.cmp(&b.entity_id))
    });
    scores.truncate(top_n);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opp(product: &str, margin: f64, volume: f64) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            product_id: product.to_string(),
            source_price: 4.0,
            reference_price: 4.0 * (1.0 + margin / 100.0),
            margin_pct: margin,
            volume_estimate: volume,
            computed_at: 0,
        }
    }

    #[test]
    fn filters_below_min_margin() {
        let out = rank(vec![opp("a", 15.0, 10.0), opp("b", 25.0, 10.0)], 20.0, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].product_id, "b");
    }

    #[test]
    fn threshold_is_inclusive() {
        let out = rank(vec![opp("a", 20.0, 10.0)], 20.0, 10);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn sorts_by_margin_then_volume_then_product() {
        let input = vec![
            opp("cocoa", 30.0, 50.0),
            opp("coffee", 40.0, 10.0),
            opp("cashews", 30.0, 80.0),
            opp("vanilla", 30.0, 50.0),
        ];
        let out = rank(input, 0.0, 10);
        let ids: Vec<&str> = out.iter().map(|o| o.product_id.as_str()).collect();
        assert_eq!(ids, vec!["coffee", "cashews", "cocoa", "vanilla"]);
    }

    #[test]
    fn order_is_stable_across_runs() {
        let input = vec![
            opp("b", 30.0, 50.0),
            opp("a", 30.0, 50.0),
            opp("c", 30.0, 50.0),
        ];
        let first = rank(input.clone(), 0.0, 10);
        for _ in 0..10 {
            let mut shuffled = input.clone();
            shuffled.reverse();
            assert_eq!(rank(shuffled, 0.0, 10), first);
        }
    }

    #[test]
    fn truncates_to_top_n() {
        let input = (0..10)
            .map(|i| opp(&format!("p{i}"), 20.0 + i as f64, 1.0))
            .collect();
        let out = rank(input, 0.0, 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].margin_pct, 29.0);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(rank(Vec::new(), 20.0, 5).is_empty());
    }
}
