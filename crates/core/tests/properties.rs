//! Property tests for the snapshot, aggregation and rule-engine invariants.

use overnight_core::domain::category::{aggregate, CategoryDef};
use overnight_core::domain::earnings::{classify, EarningsEvent, SurpriseClass};
use overnight_core::domain::snapshot::{build_snapshot, InstrumentSnapshot, Observation};
use overnight_core::rules::engine::{RuleEngine, SignalSet};
use overnight_core::strategy::StrategyConfig;
use chrono::NaiveDate;
use proptest::prelude::*;

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..2000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_volume() -> impl Strategy<Value = f64> {
    (0.0..1.0e8_f64).prop_map(f64::round)
}

fn arb_history(min: usize) -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec(
        (arb_price(), arb_volume()).prop_map(|(close, volume)| Observation { close, volume }),
        min..8,
    )
}

fn snap(symbol: &str, category: &str, change_pct: f64) -> InstrumentSnapshot {
    InstrumentSnapshot {
        symbol: symbol.to_string(),
        name: None,
        category: category.to_string(),
        current_price: 100.0,
        previous_price: 100.0,
        change_pct,
        current_volume: 1.0,
        average_prior_volume: 1.0,
        volume_ratio: 1.0,
    }
}

proptest! {
    #[test]
    fn change_pct_matches_formula(history in arb_history(2)) {
        let s = build_snapshot("NVDA", "ai", None, &history).unwrap();
        let n = history.len();
        let expected = (history[n - 1].close - history[n - 2].close) / history[n - 2].close * 100.0;
        prop_assert_eq!(s.change_pct, expected);
        prop_assert!(s.volume_ratio.is_finite());
        prop_assert!(s.volume_ratio >= 0.0);
    }

    #[test]
    fn short_histories_are_dropped(history in arb_history(0).prop_map(|mut h| { h.truncate(1); h })) {
        prop_assert!(build_snapshot("NVDA", "ai", None, &history).is_err());
    }

    #[test]
    fn category_averages_are_never_nan(changes in prop::collection::vec(-20.0..20.0_f64, 0..6)) {
        let declared = vec![
            CategoryDef { name: "ai".to_string(), symbols: vec![] },
            CategoryDef { name: "chain".to_string(), symbols: vec![] },
        ];
        let snaps: Vec<_> = changes
            .iter()
            .enumerate()
            .map(|(i, c)| snap(&format!("S{i}"), "ai", *c))
            .collect();

        let out = aggregate(&declared, &snaps);
        prop_assert!(out.get("chain").is_none());
        match out.get("ai") {
            Some(sig) => {
                prop_assert!(!sig.average_change_pct.is_nan());
                prop_assert_eq!(sig.member_symbols.len(), changes.len());
            }
            None => prop_assert!(changes.is_empty()),
        }
    }

    #[test]
    fn missing_actual_is_always_pending(estimate in prop::option::of(-5.0..5.0_f64), change in -10.0..10.0_f64) {
        let event = EarningsEvent {
            symbol: "NVDA".to_string(),
            report_date: NaiveDate::from_ymd_opt(2026, 2, 25).unwrap(),
            days_until_report: 0,
            eps_estimate: estimate,
            eps_actual: None,
        };
        let c = classify(&event, &snap("NVDA", "ai", change));
        prop_assert_eq!(c.class, SurpriseClass::Pending);
        prop_assert_eq!(c.surprise_pct, None);
    }

    #[test]
    fn default_rules_are_deterministic(changes in prop::collection::vec(-8.0..8.0_f64, 20)) {
        let strategy = StrategyConfig::embedded_default().unwrap();
        let snaps: Vec<_> = strategy
            .symbols()
            .zip(changes.iter())
            .map(|((category, symbol), c)| snap(symbol, category, *c))
            .collect();
        let categories = aggregate(&strategy.universe, &snaps);
        let engine = RuleEngine::from_strategy(&strategy);
        let signals = SignalSet::new(&snaps, &categories, &[]);

        let a = serde_json::to_string(&engine.recommend(&signals)).unwrap();
        let b = serde_json::to_string(&engine.recommend(&signals)).unwrap();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn default_rules_pad_quiet_sessions_with_baseline() {
    let strategy = StrategyConfig::embedded_default().unwrap();
    let mut snaps: Vec<_> = strategy
        .symbols()
        .map(|(category, symbol)| snap(symbol, category, 0.0))
        .collect();
    // Only NVDA moves: two substantive items, below the floor of five.
    snaps[0].change_pct = 2.5;

    let categories = aggregate(&strategy.universe, &snaps);
    let recs = RuleEngine::from_strategy(&strategy).recommend(&SignalSet::new(&snaps, &categories, &[]));
    let labels: Vec<_> = recs.iter().map(|r| r.proxy_label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "TSMC (2330)",
            "ASE (3711)",
            "TSMC (2330)",
            "MediaTek (2454)",
            "Nanya Tech (2408)"
        ]
    );
    assert!(recs[0].rationale.contains("2.50%"));
    assert_eq!(recs[0].resolved_target_price, Some(2400.0));
    assert!(!recs[3].has_foreign_target_upgrade);
}

#[test]
fn default_memory_rule_duplicates_baseline_proxy() {
    let strategy = StrategyConfig::embedded_default().unwrap();
    let snaps: Vec<_> = strategy
        .symbols()
        .map(|(category, symbol)| {
            let change = if symbol == "MU" { -4.0 } else { 0.0 };
            snap(symbol, category, change)
        })
        .collect();

    let categories = aggregate(&strategy.universe, &snaps);
    let recs = RuleEngine::from_strategy(&strategy).recommend(&SignalSet::new(&snaps, &categories, &[]));
    let nanya = recs.iter().filter(|r| r.proxy_label == "Nanya Tech (2408)").count();
    assert_eq!(nanya, 2);
    assert!(recs[0].rationale.contains("contrarian"));
    assert!(recs[0].rationale.contains("4.00%"));
}
