use crate::domain::snapshot::InstrumentSnapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Strong-reaction boundary for the post-report price move, in percent.
const STRONG_REACTION_PCT: f64 = 3.0;

/// Earnings calendar entry as supplied by a calendar collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsRecord {
    pub symbol: String,
    pub report_date: NaiveDate,
    #[serde(default)]
    pub eps_estimate: Option<f64>,
    #[serde(default)]
    pub eps_actual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub symbol: String,
    pub report_date: NaiveDate,
    /// Signed; zero or negative means already reported.
    pub days_until_report: i64,
    pub eps_estimate: Option<f64>,
    pub eps_actual: Option<f64>,
}

/// Inclusive day range, relative to the as-of date, in which events are relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsWindow {
    pub min_days: i64,
    pub max_days: i64,
}

impl Default for EarningsWindow {
    fn default() -> Self {
        Self {
            min_days: -1,
            max_days: 3,
        }
    }
}

impl EarningsWindow {
    pub fn contains(&self, days_until_report: i64) -> bool {
        (self.min_days..=self.max_days).contains(&days_until_report)
    }
}

/// Outcome of asking the calendar about one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum EarningsLookup {
    Found(EarningsEvent),
    NotFound,
    OutsideWindow { days_until_report: i64 },
    Failed(String),
}

impl EarningsLookup {
    /// A record answering for a different symbol than `requested_symbol` is a failure.
    pub fn resolve(
        requested_symbol: &str,
        fetched: anyhow::Result<Option<EarningsRecord>>,
        as_of_date: NaiveDate,
        window: EarningsWindow,
    ) -> Self {
        let record = match fetched {
            Ok(Some(record)) => record,
            Ok(None) => return Self::NotFound,
            Err(err) => return Self::Failed(format!("{err:#}")),
        };

        if !record.symbol.trim().eq_ignore_ascii_case(requested_symbol) {
            return Self::Failed(format!(
                "earnings symbol mismatch: requested {requested_symbol}, got {}",
                record.symbol
            ));
        }

        let days_until_report = (record.report_date - as_of_date).num_days();
        if !window.contains(days_until_report) {
            return Self::OutsideWindow { days_until_report };
        }

        Self::Found(EarningsEvent {
            symbol: requested_symbol.to_string(),
            report_date: record.report_date,
            days_until_report,
            eps_estimate: record.eps_estimate,
            eps_actual: record.eps_actual,
        })
    }

    pub fn into_event(self) -> Option<EarningsEvent> {
        match self {
            Self::Found(event) => Some(event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurpriseClass {
    Beat,
    Miss,
    Inline,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionBucket {
    StrongPositive,
    MildPositive,
    BeatButFell,
    StrongNegative,
    MildNegative,
    MissButRose,
    Neutral,
}

impl ReactionBucket {
    fn of(class: SurpriseClass, change_pct: f64, days_until_report: i64) -> Self {
        if days_until_report > 0 {
            return Self::Neutral;
        }
        match class {
            SurpriseClass::Beat if change_pct > STRONG_REACTION_PCT => Self::StrongPositive,
            SurpriseClass::Beat if change_pct > 0.0 => Self::MildPositive,
            SurpriseClass::Beat => Self::BeatButFell,
            SurpriseClass::Miss if change_pct < -STRONG_REACTION_PCT => Self::StrongNegative,
            SurpriseClass::Miss if change_pct < 0.0 => Self::MildNegative,
            SurpriseClass::Miss => Self::MissButRose,
            SurpriseClass::Inline | SurpriseClass::Pending => Self::Neutral,
        }
    }

    pub fn describe(self, change_pct: f64, days_until_report: i64) -> String {
        match self {
            Self::StrongPositive => "strong positive reaction".to_string(),
            Self::MildPositive => "mild positive reaction".to_string(),
            Self::BeatButFell => "beat but price fell (market-wide drag suspected)".to_string(),
            Self::StrongNegative => "strong negative reaction".to_string(),
            Self::MildNegative => "mild negative reaction".to_string(),
            Self::MissButRose => "miss but price rose (broad-market support suspected)".to_string(),
            Self::Neutral if days_until_report > 0 => {
                format!("reports in {days_until_report} day(s); price moved {change_pct:+.2}%")
            }
            Self::Neutral => format!("price moved {change_pct:+.2}% around the report"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurpriseClassification {
    pub symbol: String,
    pub report_date: NaiveDate,
    pub days_until_report: i64,
    pub class: SurpriseClass,
    /// Unsigned magnitude; `None` while pending.
    pub surprise_pct: Option<f64>,
    pub change_pct: f64,
    pub reaction: ReactionBucket,
    pub reaction_text: String,
}

impl SurpriseClassification {
    /// Surprise with direction: positive for a beat, negative for a miss.
    pub fn signed_surprise_pct(&self) -> Option<f64> {
        let magnitude = self.surprise_pct?;
        Some(match self.class {
            SurpriseClass::Miss => -magnitude,
            _ => magnitude,
        })
    }
}

fn surprise_magnitude(actual: f64, estimate: f64) -> f64 {
    if estimate == 0.0 {
        return 0.0;
    }
    (actual - estimate).abs() / estimate.abs() * 100.0
}

/// Classifies one event. Missing EPS fields resolve to `Pending`, never an error.
pub fn classify(event: &EarningsEvent, snapshot: &InstrumentSnapshot) -> SurpriseClassification {
    let (class, surprise_pct) = match (event.eps_estimate, event.eps_actual) {
        (Some(estimate), Some(actual)) if actual > estimate => {
            (SurpriseClass::Beat, Some(surprise_magnitude(actual, estimate)))
        }
        (Some(estimate), Some(actual)) if actual < estimate => {
            (SurpriseClass::Miss, Some(surprise_magnitude(actual, estimate)))
        }
        (Some(_), Some(_)) => (SurpriseClass::Inline, Some(0.0)),
        _ => (SurpriseClass::Pending, None),
    };

    let change_pct = snapshot.change_pct;
    let reaction = ReactionBucket::of(class, change_pct, event.days_until_report);

    SurpriseClassification {
        symbol: event.symbol.clone(),
        report_date: event.report_date,
        days_until_report: event.days_until_report,
        class,
        surprise_pct,
        change_pct,
        reaction,
        reaction_text: reaction.describe(change_pct, event.days_until_report),
    }
}
