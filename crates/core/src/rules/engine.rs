use crate::domain::category::CategorySignals;
use crate::domain::earnings::SurpriseClassification;
use crate::domain::recommendation::{Recommendation, TargetPriceRecord};
use crate::domain::snapshot::InstrumentSnapshot;
use crate::rules::{FallbackRule, ProxyTemplate, RuleSpec, SignalRef};
use crate::strategy::StrategyConfig;
use std::collections::BTreeMap;

/// Everything the rules may look at for one run.
#[derive(Debug, Clone, Copy)]
pub struct SignalSet<'a> {
    pub snapshots: &'a [InstrumentSnapshot],
    pub categories: &'a CategorySignals,
    pub earnings: &'a [SurpriseClassification],
}

impl<'a> SignalSet<'a> {
    pub fn new(
        snapshots: &'a [InstrumentSnapshot],
        categories: &'a CategorySignals,
        earnings: &'a [SurpriseClassification],
    ) -> Self {
        Self {
            snapshots,
            categories,
            earnings,
        }
    }

    /// Current value of `signal`, or `None` when the input did not survive.
    pub fn value(&self, signal: &SignalRef) -> Option<f64> {
        match signal {
            SignalRef::Instrument { symbol } => self
                .snapshots
                .iter()
                .find(|s| &s.symbol == symbol)
                .map(|s| s.change_pct),
            SignalRef::Category { category } => {
                self.categories.get(category).map(|c| c.average_change_pct)
            }
            SignalRef::EarningsSurprise { symbol } => self
                .earnings
                .iter()
                .find(|e| &e.symbol == symbol)
                .and_then(|e| e.signed_surprise_pct()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<RuleSpec>,
    fallback: Vec<FallbackRule>,
    targets: BTreeMap<String, TargetPriceRecord>,
}

impl RuleEngine {
    pub fn new(
        rules: Vec<RuleSpec>,
        fallback: Vec<FallbackRule>,
        target_prices: Vec<TargetPriceRecord>,
    ) -> Self {
        let targets = target_prices
            .into_iter()
            .map(|t| (t.proxy_label.clone(), t))
            .collect();
        Self {
            rules,
            fallback,
            targets,
        }
    }

    pub fn from_strategy(strategy: &StrategyConfig) -> Self {
        Self::new(
            strategy.rules.clone(),
            strategy.fallback.clone(),
            strategy.target_prices.clone(),
        )
    }

    /// Evaluates every rule in order, then the fallback rules.
    ///
    /// Output is not deduplicated: a proxy emitted by two rules appears twice.
    pub fn recommend(&self, signals: &SignalSet<'_>) -> Vec<Recommendation> {
        let mut out = Vec::new();

        for rule in &self.rules {
            let Some(value) = signals.value(rule.signal()) else {
                tracing::debug!(rule = rule.id(), subject = rule.signal().subject(), "signal missing; rule skipped");
                continue;
            };

            for branch in rule.branches() {
                if !branch.comparison.holds(value) {
                    continue;
                }
                tracing::debug!(rule = rule.id(), value, comparison = ?branch.comparison, emitted = branch.emit.len(), "rule fired");
                for template in branch.emit {
                    out.push(self.resolve(rule.id(), template, Some((rule.signal(), value))));
                }
            }
        }

        let substantive = out.len();
        for rule in &self.fallback {
            if substantive >= rule.floor {
                continue;
            }
            tracing::debug!(rule = %rule.id, substantive, floor = rule.floor, "fallback fired");
            for template in &rule.emit {
                out.push(self.resolve(&rule.id, template, None));
            }
        }

        out
    }

    fn resolve(
        &self,
        rule_id: &str,
        template: &ProxyTemplate,
        signal: Option<(&SignalRef, f64)>,
    ) -> Recommendation {
        let resolved_target = self.targets.get(&template.proxy_label).cloned();
        Recommendation {
            proxy_label: template.proxy_label.clone(),
            rule_id: rule_id.to_string(),
            rationale: render(&template.rationale, signal),
            entry_timing: template.entry_timing.clone(),
            risk: template.risk.clone(),
            has_foreign_target_upgrade: resolved_target.is_some(),
            resolved_target_price: resolved_target.as_ref().map(|t| t.target_price),
            resolved_target,
        }
    }
}

fn render(template: &str, signal: Option<(&SignalRef, f64)>) -> String {
    let Some((signal, value)) = signal else {
        return template.to_string();
    };

    let mut out = template
        .replace("{value}", &format!("{value:.2}"))
        .replace("{abs_value}", &format!("{:.2}", value.abs()));
    match signal {
        SignalRef::Instrument { symbol } | SignalRef::EarningsSurprise { symbol } => {
            out = out.replace("{symbol}", symbol);
        }
        SignalRef::Category { category } => {
            out = out.replace("{category}", category);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::{aggregate, CategoryDef};
    use crate::domain::earnings::{classify, EarningsEvent};
    use chrono::NaiveDate;

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

    fn tpl(label: &str, rationale: &str) -> ProxyTemplate {
        ProxyTemplate {
            proxy_label: label.to_string(),
            rationale: rationale.to_string(),
            entry_timing: "on open".to_string(),
            risk: "volatile".to_string(),
        }
    }

    fn instrument(symbol: &str) -> SignalRef {
        SignalRef::Instrument {
            symbol: symbol.to_string(),
        }
    }

    fn category(name: &str) -> SignalRef {
        SignalRef::Category {
            category: name.to_string(),
        }
    }

    fn threshold(id: &str, signal: SignalRef, above: f64, emit: Vec<ProxyTemplate>) -> RuleSpec {
        RuleSpec::Threshold {
            id: id.to_string(),
            signal,
            above,
            emit,
        }
    }

    fn labels(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.proxy_label.as_str()).collect()
    }

    struct Fixture {
        snapshots: Vec<InstrumentSnapshot>,
        categories: CategorySignals,
    }

    impl Fixture {
        fn new(snapshots: Vec<InstrumentSnapshot>) -> Self {
            let declared = vec![
                CategoryDef {
                    name: "ai".to_string(),
                    symbols: vec!["NVDA".to_string(), "AMD".to_string()],
                },
                CategoryDef {
                    name: "memory".to_string(),
                    symbols: vec!["MU".to_string()],
                },
            ];
            let categories = aggregate(&declared, &snapshots);
            Self {
                snapshots,
                categories,
            }
        }

        fn signals(&self) -> SignalSet<'_> {
            SignalSet::new(&self.snapshots, &self.categories, &[])
        }
    }

    #[test]
    fn threshold_rules_fire_above_and_render_magnitude() {
        let engine = RuleEngine::new(
            vec![
                threshold("nvda", instrument("NVDA"), 2.0, vec![tpl("TSMC (2330)", "{symbol} up {value}%")]),
                threshold("ai", category("ai"), 1.0, vec![tpl("Quanta (2382)", "{category} avg {value}%")]),
            ],
            vec![],
            vec![],
        );
        let fx = Fixture::new(vec![snap("NVDA", "ai", 3.456), snap("AMD", "ai", 0.0)]);

        let recs = engine.recommend(&fx.signals());
        assert_eq!(labels(&recs), vec!["TSMC (2330)", "Quanta (2382)"]);
        assert_eq!(recs[0].rationale, "NVDA up 3.46%");
        assert_eq!(recs[0].rule_id, "nvda");
        assert_eq!(recs[1].rationale, "ai avg 1.73%");
    }

    #[test]
    fn threshold_is_strict_and_missing_signal_does_not_fire() {
        let engine = RuleEngine::new(
            vec![
                threshold("nvda", instrument("NVDA"), 2.0, vec![tpl("TSMC (2330)", "r")]),
                threshold("aapl", instrument("AAPL"), -100.0, vec![tpl("Hon Hai (2317)", "r")]),
                threshold("chain", category("chain"), -100.0, vec![tpl("Alchip (3661)", "r")]),
            ],
            vec![],
            vec![],
        );
        let fx = Fixture::new(vec![snap("NVDA", "ai", 2.0)]);
        assert!(engine.recommend(&fx.signals()).is_empty());
    }

    fn directional_engine() -> RuleEngine {
        RuleEngine::new(
            vec![RuleSpec::Directional {
                id: "memory".to_string(),
                signal: instrument("MU"),
                above: 2.0,
                emit_above: vec![tpl("Nanya (2408)", "MU up {value}%")],
                below: -3.0,
                emit_below: vec![
                    tpl("Nanya (2408)", "MU down {abs_value}%, accumulate"),
                    tpl("Winbond (2344)", "contrarian"),
                ],
            }],
            vec![],
            vec![],
        )
    }

    #[test]
    fn directional_upper_branch() {
        let fx = Fixture::new(vec![snap("MU", "memory", 2.5)]);
        let recs = directional_engine().recommend(&fx.signals());
        assert_eq!(labels(&recs), vec!["Nanya (2408)"]);
        assert_eq!(recs[0].rationale, "MU up 2.50%");
    }

    #[test]
    fn directional_lower_branch() {
        let fx = Fixture::new(vec![snap("MU", "memory", -4.0)]);
        let recs = directional_engine().recommend(&fx.signals());
        assert_eq!(labels(&recs), vec!["Nanya (2408)", "Winbond (2344)"]);
        assert_eq!(recs[0].rationale, "MU down 4.00%, accumulate");
    }

    #[test]
    fn directional_dead_zone_emits_nothing() {
        let fx = Fixture::new(vec![snap("MU", "memory", -3.0)]);
        assert!(directional_engine().recommend(&fx.signals()).is_empty());
    }

    fn fallback() -> FallbackRule {
        FallbackRule {
            id: "baseline".to_string(),
            floor: 5,
            emit: vec![tpl("TSMC (2330)", "baseline"), tpl("Nanya (2408)", "baseline")],
        }
    }

    #[test]
    fn fallback_appends_when_below_floor() {
        let engine = RuleEngine::new(
            vec![threshold(
                "nvda",
                instrument("NVDA"),
                2.0,
                vec![tpl("A", "r"), tpl("B", "r"), tpl("C", "r")],
            )],
            vec![fallback()],
            vec![],
        );
        let fx = Fixture::new(vec![snap("NVDA", "ai", 5.0)]);
        let recs = engine.recommend(&fx.signals());
        assert_eq!(labels(&recs), vec!["A", "B", "C", "TSMC (2330)", "Nanya (2408)"]);
        assert_eq!(recs[3].rule_id, "baseline");
    }

    #[test]
    fn fallback_skipped_at_floor() {
        let engine = RuleEngine::new(
            vec![threshold(
                "nvda",
                instrument("NVDA"),
                2.0,
                (0..5).map(|i| tpl(&format!("P{i}"), "r")).collect(),
            )],
            vec![fallback()],
            vec![],
        );
        let fx = Fixture::new(vec![snap("NVDA", "ai", 5.0)]);
        assert_eq!(engine.recommend(&fx.signals()).len(), 5);
    }

    #[test]
    fn same_proxy_from_two_rules_is_kept_twice() {
        let engine = RuleEngine::new(
            vec![threshold("mu", instrument("MU"), 2.0, vec![tpl("Nanya (2408)", "memory")])],
            vec![fallback()],
            vec![],
        );
        let fx = Fixture::new(vec![snap("MU", "memory", 3.0)]);
        let recs = engine.recommend(&fx.signals());
        let count = recs.iter().filter(|r| r.proxy_label == "Nanya (2408)").count();
        assert_eq!(count, 2);
    }

    #[test]
    fn resolves_target_prices_by_label() {
        let engine = RuleEngine::new(
            vec![threshold(
                "nvda",
                instrument("NVDA"),
                0.0,
                vec![tpl("TSMC (2330)", "r"), tpl("Alchip (3661)", "r")],
            )],
            vec![],
            vec![TargetPriceRecord {
                proxy_label: "TSMC (2330)".to_string(),
                target_price: 2400.0,
                source: "Aletheia Capital".to_string(),
                note: None,
            }],
        );
        let fx = Fixture::new(vec![snap("NVDA", "ai", 1.0)]);
        let recs = engine.recommend(&fx.signals());
        assert!(recs[0].has_foreign_target_upgrade);
        assert_eq!(recs[0].resolved_target_price, Some(2400.0));
        assert!(!recs[1].has_foreign_target_upgrade);
        assert_eq!(recs[1].resolved_target_price, None);

        let json = serde_json::to_value(&recs).unwrap();
        assert_eq!(json[0]["resolved_target_price"], 2400.0);
        assert_eq!(json[0]["resolved_target"]["source"], "Aletheia Capital");
        assert!(json[1]["resolved_target_price"].is_null());
    }

    #[test]
    fn earnings_surprise_signal() {
        let engine = RuleEngine::new(
            vec![threshold(
                "nvda_beat",
                SignalRef::EarningsSurprise {
                    symbol: "NVDA".to_string(),
                },
                5.0,
                vec![tpl("TSMC (2330)", "{symbol} beat by {value}%")],
            )],
            vec![],
            vec![],
        );
        let fx = Fixture::new(vec![snap("NVDA", "ai", 1.0)]);
        let event = EarningsEvent {
            symbol: "NVDA".to_string(),
            report_date: NaiveDate::from_ymd_opt(2026, 2, 25).unwrap(),
            days_until_report: 0,
            eps_estimate: Some(1.0),
            eps_actual: Some(1.5),
        };
        let earnings = vec![classify(&event, &fx.snapshots[0])];

        let recs = engine.recommend(&SignalSet::new(&fx.snapshots, &fx.categories, &earnings));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].rationale, "NVDA beat by 50.00%");

        // No classification for the symbol: the rule stays silent.
        assert!(engine.recommend(&fx.signals()).is_empty());
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let engine = directional_engine();
        let fx = Fixture::new(vec![snap("MU", "memory", -5.0), snap("NVDA", "ai", 1.0)]);
        let a = serde_json::to_string(&engine.recommend(&fx.signals())).unwrap();
        let b = serde_json::to_string(&engine.recommend(&fx.signals())).unwrap();
        assert_eq!(a, b);
    }
}
