use crate::domain::snapshot::InstrumentSnapshot;
use serde::{Deserialize, Serialize};

/// A statically declared category and its member symbols, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySignal {
    pub category: String,
    /// Surviving members in the order their snapshots were supplied.
    pub member_symbols: Vec<String>,
    pub average_change_pct: f64,
}

/// Category signals in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySignals(Vec<CategorySignal>);

impl CategorySignals {
    pub fn get(&self, category: &str) -> Option<&CategorySignal> {
        self.0.iter().find(|c| c.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategorySignal> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Groups snapshots by category and averages `change_pct` per group.
///
/// Output order follows `declared`; a category without surviving members is
/// absent. Snapshots tagged with an undeclared category are appended after the
/// declared ones in first-seen order.
pub fn aggregate(declared: &[CategoryDef], snapshots: &[InstrumentSnapshot]) -> CategorySignals {
    let mut order: Vec<&str> = declared.iter().map(|c| c.name.as_str()).collect();
    for snap in snapshots {
        if !order.contains(&snap.category.as_str()) {
            order.push(snap.category.as_str());
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for category in order {
        let members: Vec<&InstrumentSnapshot> =
            snapshots.iter().filter(|s| s.category == category).collect();
        if members.is_empty() {
            continue;
        }

        let total: f64 = members.iter().map(|s| s.change_pct).sum();
        out.push(CategorySignal {
            category: category.to_string(),
            member_symbols: members.iter().map(|s| s.symbol.clone()).collect(),
            average_change_pct: total / members.len() as f64,
        });
    }

    CategorySignals(out)
}
