use crate::domain::earnings::EarningsRecord;
use crate::ingest::earnings::EarningsCalendar;
use crate::ingest::provider::PriceHistoryProvider;
use crate::ingest::types::PriceHistory;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Offline market data: canned histories and earnings keyed by symbol.
///
/// Unknown symbols yield an empty history. Symbols listed in `failures` return
/// an error, which lets callers exercise the fetch-failure path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureMarketData {
    #[serde(default)]
    pub histories: BTreeMap<String, PriceHistory>,
    #[serde(default)]
    pub earnings: BTreeMap<String, EarningsRecord>,
    #[serde(default)]
    pub failures: BTreeSet<String>,
}

impl FixtureMarketData {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("fixture file {} is not valid JSON", path.display()))
    }

    pub fn with_history(mut self, symbol: &str, history: PriceHistory) -> Self {
        self.histories.insert(symbol.to_string(), history);
        self
    }

    pub fn with_earnings(mut self, record: EarningsRecord) -> Self {
        self.earnings.insert(record.symbol.clone(), record);
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failures.insert(symbol.to_string());
        self
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for FixtureMarketData {
    fn provider_name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_history(&self, symbol: &str, window: usize) -> Result<PriceHistory> {
        if self.failures.contains(symbol) {
            anyhow::bail!("fixture fetch failure for {symbol}");
        }
        Ok(self
            .histories
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .truncate_to(window))
    }
}

#[async_trait::async_trait]
impl EarningsCalendar for FixtureMarketData {
    fn provider_name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_upcoming_earnings(&self, symbol: &str) -> Result<Option<EarningsRecord>> {
        if self.failures.contains(symbol) {
            anyhow::bail!("fixture earnings failure for {symbol}");
        }
        Ok(self.earnings.get(symbol).cloned())
    }
}
