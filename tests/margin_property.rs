// tests/margin_property.rs
//
// Property-style checks over random inputs: the margin formula is exact
// for any positive source price, and rubric totals stay inside [0,100].

use rand::Rng;

use trade_intelligence::scoring::arbitrage::margin_pct;
use trade_intelligence::scoring::entity::{BuyerProfile, Rubric, SupplierProfile};

#[test]
fn margin_formula_holds_for_random_positive_prices() {
    let mut rng = rand::rng();
    for _ in 0..10_000 {
        let source: f64 = rng.random_range(0.01..10_000.0);
        let reference: f64 = rng.random_range(0.0..10_000.0);
        let expected = (reference - source) / source * 100.0;
        let got = margin_pct(source, reference).expect("positive source price must score");
        assert_eq!(got, expected, "source={source} reference={reference}");
    }
}

#[test]
fn margin_undefined_for_non_positive_source() {
    let mut rng = rand::rng();
    for _ in 0..1_000 {
        let source: f64 = -rng.random_range(0.0..10_000.0);
        let reference: f64 = rng.random_range(0.0..10_000.0);
        assert_eq!(margin_pct(source, reference), None);
    }
}

#[test]
fn supplier_totals_bounded_for_random_profiles() {
    let rubric = Rubric::supplier().unwrap();
    let mut rng = rand::rng();
    let cert_pool = ["organic", "fair trade", "kosher", "random stamp", "halal"];

    for i in 0..2_000 {
        let n_certs = rng.random_range(0..cert_pool.len());
        let profile = SupplierProfile {
            supplier_id: format!("s{i}"),
            certifications: cert_pool[..n_certs].iter().map(|s| s.to_string()).collect(),
            years_in_business: rng.random_range(0..60),
            annual_capacity_tons: rng.random_range(0.0..20_000.0),
            years_exporting: rng.random_range(0..40),
            avg_response_hours: rng.random_range(0.0..200.0),
            sustainability_program: rng.random_bool(0.5),
            price_discount_pct: rng.random_range(-50.0..80.0),
        };
        let score = rubric.score(&profile.supplier_id, &profile.raw_criteria());
        assert!(
            (0.0..=100.0).contains(&score.total_score),
            "total {} out of bounds",
            score.total_score
        );
        for (name, c) in &score.criteria {
            assert!(
                (0.0..=100.0).contains(&c.normalized),
                "criterion {name} normalized {} out of bounds",
                c.normalized
            );
        }
    }
}

#[test]
fn buyer_totals_bounded_for_random_profiles() {
    let rubric = Rubric::buyer().unwrap();
    let mut rng = rand::rng();

    for i in 0..2_000 {
        let profile = BuyerProfile {
            buyer_id: format!("b{i}"),
            annual_purchase_volume_tons: rng.random_range(0.0..50_000.0),
            on_time_payment_rate: rng.random_range(0.0..1.5), // deliberately past 1.0
            distribution_states: rng.random_range(0..60),
            yoy_growth_pct: rng.random_range(-30.0..120.0),
            specialty_focus: rng.random_bool(0.5),
            avg_response_hours: rng.random_range(0.0..200.0),
        };
        let score = rubric.score(&profile.buyer_id, &profile.raw_criteria());
        assert!((0.0..=100.0).contains(&score.total_score));
    }
}

#[test]
fn both_rubrics_weigh_exactly_100() {
    assert_eq!(Rubric::supplier().unwrap().weight_sum(), 100);
    assert_eq!(Rubric::buyer().unwrap().weight_sum(), 100);
}
