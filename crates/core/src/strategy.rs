use crate::domain::category::CategoryDef;
use crate::domain::earnings::EarningsWindow;
use crate::domain::recommendation::TargetPriceRecord;
use crate::error::MIN_OBSERVATIONS;
use crate::rules::{FallbackRule, ProxyTemplate, RuleSpec, SignalRef};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const DEFAULT_STRATEGY_JSON: &str = include_str!("../strategies/default.json");
const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Read-only inputs for one run: the category partition, the rule set and the
/// target-price table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub universe: Vec<CategoryDef>,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default)]
    pub earnings_window: EarningsWindow,
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub fallback: Vec<FallbackRule>,
    #[serde(default)]
    pub target_prices: Vec<TargetPriceRecord>,
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

impl StrategyConfig {
    pub fn embedded_default() -> anyhow::Result<Self> {
        Self::from_json_str(DEFAULT_STRATEGY_JSON).context("embedded default strategy is invalid")
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read strategy file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid strategy file {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let parsed = serde_json::from_str::<Self>(text).context("strategy is not valid JSON for the schema")?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// `(category, symbol)` pairs in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, &str)> {
        self.universe
            .iter()
            .flat_map(|c| c.symbols.iter().map(move |s| (c.name.as_str(), s.as_str())))
    }

    pub fn category_of(&self, symbol: &str) -> Option<&str> {
        self.symbols().find(|(_, s)| *s == symbol).map(|(c, _)| c)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.universe.is_empty(), "universe must declare at least one category");
        ensure!(
            self.history_window >= MIN_OBSERVATIONS,
            "history_window must be >= {} (got {})",
            MIN_OBSERVATIONS,
            self.history_window
        );
        ensure!(
            self.earnings_window.min_days <= self.earnings_window.max_days,
            "earnings_window min_days {} exceeds max_days {}",
            self.earnings_window.min_days,
            self.earnings_window.max_days
        );

        let mut categories = BTreeSet::<&str>::new();
        let mut symbols = BTreeSet::<&str>::new();
        for category in &self.universe {
            let name = category.name.trim();
            ensure!(!name.is_empty(), "category name must be non-empty");
            ensure!(categories.insert(name), "duplicate category: {name}");
            ensure!(!category.symbols.is_empty(), "category {name} has no symbols");
            for symbol in &category.symbols {
                let symbol = symbol.trim();
                ensure!(!symbol.is_empty(), "category {name} has an empty symbol");
                ensure!(symbols.insert(symbol), "symbol {symbol} appears in more than one category");
            }
        }

        let mut rule_ids = BTreeSet::<&str>::new();
        for rule in &self.rules {
            let id = rule.id();
            ensure!(!id.trim().is_empty(), "rule id must be non-empty");
            ensure!(rule_ids.insert(id), "duplicate rule id: {id}");

            match rule.signal() {
                SignalRef::Instrument { symbol } | SignalRef::EarningsSurprise { symbol } => ensure!(
                    symbols.contains(symbol.as_str()),
                    "rule {id} references unknown symbol {symbol}"
                ),
                SignalRef::Category { category } => ensure!(
                    categories.contains(category.as_str()),
                    "rule {id} references unknown category {category}"
                ),
            }

            match rule {
                RuleSpec::Threshold { above, emit, .. } => {
                    ensure!(above.is_finite(), "rule {id}: threshold must be finite");
                    ensure!(!emit.is_empty(), "rule {id} emits nothing");
                }
                RuleSpec::Directional {
                    above,
                    below,
                    emit_above,
                    emit_below,
                    ..
                } => {
                    ensure!(
                        above.is_finite() && below.is_finite(),
                        "rule {id}: thresholds must be finite"
                    );
                    ensure!(
                        below < above,
                        "rule {id}: below ({below}) must be less than above ({above})"
                    );
                    ensure!(
                        !emit_above.is_empty() || !emit_below.is_empty(),
                        "rule {id} emits nothing"
                    );
                }
            }

            for template in rule.templates() {
                validate_template(id, template)?;
            }
        }

        for rule in &self.fallback {
            ensure!(rule_ids.insert(rule.id.as_str()), "duplicate rule id: {}", rule.id);
            ensure!(rule.floor >= 1, "fallback {}: floor must be >= 1", rule.id);
            for template in &rule.emit {
                validate_template(&rule.id, template)?;
            }
        }

        let mut labels = BTreeSet::<&str>::new();
        for target in &self.target_prices {
            let label = target.proxy_label.trim();
            ensure!(!label.is_empty(), "target price label must be non-empty");
            ensure!(labels.insert(label), "duplicate target price label: {label}");
            ensure!(
                target.target_price.is_finite() && target.target_price > 0.0,
                "target price for {label} must be positive (got {})",
                target.target_price
            );
        }

        Ok(())
    }
}

fn validate_template(rule_id: &str, template: &ProxyTemplate) -> anyhow::Result<()> {
    ensure!(
        !template.proxy_label.trim().is_empty(),
        "rule {rule_id}: proxy_label must be non-empty"
    );
    ensure!(
        !template.rationale.trim().is_empty(),
        "rule {rule_id}: rationale for {} must be non-empty",
        template.proxy_label
    );
    Ok(())
}
