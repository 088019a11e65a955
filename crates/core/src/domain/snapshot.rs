use crate::error::DataUnavailable;
use serde::{Deserialize, Serialize};

/// One trading session for a source-market instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub symbol: String,
    pub name: Option<String>,
    pub category: String,
    pub current_price: f64,
    pub previous_price: f64,
    pub change_pct: f64,
    pub current_volume: f64,
    pub average_prior_volume: f64,
    pub volume_ratio: f64,
}

/// Builds a snapshot from a history window ordered oldest first.
///
/// Fewer than [`crate::error::MIN_OBSERVATIONS`] observations yields [`DataUnavailable`]; callers drop the
/// symbol and keep going.
pub fn build_snapshot(
    symbol: &str,
    category: &str,
    name: Option<String>,
    history: &[Observation],
) -> Result<InstrumentSnapshot, DataUnavailable> {
    let [.., previous, current] = history else {
        return Err(DataUnavailable {
            symbol: symbol.to_string(),
            observations: history.len(),
        });
    };
    if !(previous.close.is_finite() && previous.close > 0.0) {
        return Err(DataUnavailable {
            symbol: symbol.to_string(),
            observations: history.len(),
        });
    }
    let prior = &history[..history.len() - 1];

    let change_pct = (current.close - previous.close) / previous.close * 100.0;

    let average_prior_volume = prior.iter().map(|o| o.volume).sum::<f64>() / prior.len() as f64;
    let volume_ratio = if average_prior_volume > 0.0 {
        current.volume / average_prior_volume
    } else {
        0.0
    };

    Ok(InstrumentSnapshot {
        symbol: symbol.to_string(),
        name,
        category: category.to_string(),
        current_price: current.close,
        previous_price: previous.close,
        change_pct,
        current_volume: current.volume,
        average_prior_volume,
        volume_ratio,
    })
}
