use serde::{Deserialize, Serialize};

/// Externally curated price target for a domestic proxy instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPriceRecord {
    pub proxy_label: String,
    pub target_price: f64,
    pub source: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub proxy_label: String,
    /// Id of the rule that emitted this item.
    pub rule_id: String,
    pub rationale: String,
    pub entry_timing: String,
    pub risk: String,
    pub has_foreign_target_upgrade: bool,
    pub resolved_target_price: Option<f64>,
    /// Full target record, including its source attribution.
    pub resolved_target: Option<TargetPriceRecord>,
}
