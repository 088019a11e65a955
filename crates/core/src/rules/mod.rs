//! Declarative recommendation rules.
//!
//! A rule names one signal, one or two comparisons, and the proxy templates to
//! emit when a comparison holds. The engine in [`engine`] evaluates them in
//! declaration order with a single loop.

pub mod engine;

use serde::{Deserialize, Serialize};

/// Where a rule reads its number from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalRef {
    /// An instrument's `change_pct`.
    Instrument { symbol: String },
    /// A category's `average_change_pct`.
    Category { category: String },
    /// Signed EPS surprise percentage of a classified earnings event.
    EarningsSurprise { symbol: String },
}

impl SignalRef {
    pub fn subject(&self) -> &str {
        match self {
            Self::Instrument { symbol } | Self::EarningsSurprise { symbol } => symbol,
            Self::Category { category } => category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    /// Strictly greater than.
    Above(f64),
    /// Strictly less than.
    Below(f64),
}

impl Comparison {
    pub fn holds(self, value: f64) -> bool {
        match self {
            Self::Above(t) => value > t,
            Self::Below(t) => value < t,
        }
    }
}

/// Output of a rule branch. `rationale` may use `{value}`, `{abs_value}`,
/// `{symbol}` and `{category}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyTemplate {
    pub proxy_label: String,
    pub rationale: String,
    pub entry_timing: String,
    pub risk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Fires when the signal exceeds `above`.
    Threshold {
        id: String,
        signal: SignalRef,
        above: f64,
        emit: Vec<ProxyTemplate>,
    },
    /// Two independent branches on the same signal.
    Directional {
        id: String,
        signal: SignalRef,
        above: f64,
        emit_above: Vec<ProxyTemplate>,
        below: f64,
        emit_below: Vec<ProxyTemplate>,
    },
}

/// One predicate plus its outputs.
#[derive(Debug, Clone, Copy)]
pub struct Branch<'a> {
    pub comparison: Comparison,
    pub emit: &'a [ProxyTemplate],
}

impl RuleSpec {
    pub fn id(&self) -> &str {
        match self {
            Self::Threshold { id, .. } | Self::Directional { id, .. } => id,
        }
    }

    pub fn signal(&self) -> &SignalRef {
        match self {
            Self::Threshold { signal, .. } | Self::Directional { signal, .. } => signal,
        }
    }

    pub fn branches(&self) -> Vec<Branch<'_>> {
        match self {
            Self::Threshold { above, emit, .. } => vec![Branch {
                comparison: Comparison::Above(*above),
                emit,
            }],
            Self::Directional {
                above,
                emit_above,
                below,
                emit_below,
                ..
            } => vec![
                Branch {
                    comparison: Comparison::Above(*above),
                    emit: emit_above,
                },
                Branch {
                    comparison: Comparison::Below(*below),
                    emit: emit_below,
                },
            ],
        }
    }

    pub fn templates(&self) -> impl Iterator<Item = &ProxyTemplate> {
        let (first, second) = match self {
            Self::Threshold { emit, .. } => (emit.as_slice(), &[][..]),
            Self::Directional {
                emit_above,
                emit_below,
                ..
            } => (emit_above.as_slice(), emit_below.as_slice()),
        };
        first.iter().chain(second.iter())
    }
}

/// Baseline set appended when substantive rules produced fewer than `floor` items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub id: String,
    pub floor: usize,
    pub emit: Vec<ProxyTemplate>,
}
