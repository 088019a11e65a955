use crate::domain::category::CategorySignals;
use crate::domain::snapshot::InstrumentSnapshot;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const TOP_N: usize = 5;
const VOLUME_SPIKE_RATIO: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: String,
    pub name: Option<String>,
    pub change_pct: f64,
    pub current_price: f64,
    pub volume_ratio: f64,
}

impl From<&InstrumentSnapshot> for Mover {
    fn from(s: &InstrumentSnapshot) -> Self {
        Self {
            symbol: s.symbol.clone(),
            name: s.name.clone(),
            change_pct: s.change_pct,
            current_price: s.current_price,
            volume_ratio: s.volume_ratio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub top_gainers: Vec<Mover>,
    pub top_losers: Vec<Mover>,
    /// Current volume above 1.5x the prior average, largest ratio first.
    pub volume_spikes: Vec<Mover>,
    /// Per-category members, strongest move first, in category order.
    pub by_category: Vec<CategoryRanking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRanking {
    pub category: String,
    pub average_change_pct: f64,
    pub members: Vec<Mover>,
}

fn by_change_desc(a: &&InstrumentSnapshot, b: &&InstrumentSnapshot) -> Ordering {
    b.change_pct
        .partial_cmp(&a.change_pct)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

pub fn highlights(snapshots: &[InstrumentSnapshot], categories: &CategorySignals) -> Highlights {
    let mut ranked: Vec<&InstrumentSnapshot> = snapshots.iter().collect();
    ranked.sort_by(by_change_desc);
    let top_gainers = ranked.iter().take(TOP_N).map(|s| Mover::from(*s)).collect();

    ranked.sort_by(|a, b| {
        a.change_pct
            .partial_cmp(&b.change_pct)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    let top_losers = ranked.iter().take(TOP_N).map(|s| Mover::from(*s)).collect();

    let mut spikes: Vec<&InstrumentSnapshot> = snapshots
        .iter()
        .filter(|s| s.volume_ratio > VOLUME_SPIKE_RATIO)
        .collect();
    spikes.sort_by(|a, b| {
        b.volume_ratio
            .partial_cmp(&a.volume_ratio)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let by_category = categories
        .iter()
        .map(|c| CategoryRanking {
            category: c.category.clone(),
            average_change_pct: c.average_change_pct,
            members: ranked_members(snapshots, &c.category)
                .into_iter()
                .map(Mover::from)
                .collect(),
        })
        .collect();

    Highlights {
        top_gainers,
        top_losers,
        volume_spikes: spikes.into_iter().map(Mover::from).collect(),
        by_category,
    }
}

/// Members of one category, strongest move first.
pub fn ranked_members<'a>(
    snapshots: &'a [InstrumentSnapshot],
    category: &str,
) -> Vec<&'a InstrumentSnapshot> {
    let mut members: Vec<&InstrumentSnapshot> =
        snapshots.iter().filter(|s| s.category == category).collect();
    members.sort_by(by_change_desc);
    members
}
