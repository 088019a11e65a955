use thiserror::Error;

/// Minimum number of observations needed to compute a day-over-day change.
pub const MIN_OBSERVATIONS: usize = 2;

/// A symbol could not produce a snapshot. Recovered locally by dropping the symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error(
    "insufficient history for {symbol} ({observations} observation(s), need {} with a positive prior close)",
    MIN_OBSERVATIONS
)]
pub struct DataUnavailable {
    pub symbol: String,
    pub observations: usize,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// No symbol in the whole universe produced a snapshot.
    #[error("no instrument produced a snapshot ({attempted} attempted)")]
    EmptyUniverse { attempted: usize },
}
