use crate::domain::snapshot::Observation;
use serde::{Deserialize, Serialize};

/// Trailing price/volume window for one symbol, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    #[serde(default)]
    pub name: Option<String>,
    pub observations: Vec<Observation>,
}

impl PriceHistory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keeps only the most recent `window` observations.
    pub fn truncate_to(mut self, window: usize) -> Self {
        let len = self.observations.len();
        if len > window {
            self.observations.drain(..len - window);
        }
        self
    }
}

/// Yahoo Finance `v8/finance/chart` response (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default, rename = "shortName")]
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Sessions without a close (halts, partial bars) are skipped; a missing
    /// volume counts as zero.
    pub fn into_history(self) -> PriceHistory {
        let mut observations = Vec::new();
        if let Some(series) = self.indicators.quote.into_iter().next() {
            for (idx, close) in series.close.iter().copied().enumerate() {
                let Some(close) = close.filter(|c| c.is_finite()) else {
                    continue;
                };
                let volume = series.volume.get(idx).copied().flatten().unwrap_or(0.0);
                observations.push(Observation { close, volume });
            }
        }

        PriceHistory {
            name: self.meta.short_name,
            observations,
        }
    }
}
