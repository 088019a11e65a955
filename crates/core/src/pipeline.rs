use crate::domain::category::{aggregate, CategorySignals};
use crate::domain::earnings::{classify, EarningsLookup, SurpriseClassification};
use crate::domain::highlights::{highlights, Highlights};
use crate::domain::recommendation::Recommendation;
use crate::domain::snapshot::{build_snapshot, InstrumentSnapshot};
use crate::error::{DataUnavailable, PipelineError};
use crate::ingest::earnings::EarningsCalendar;
use crate::ingest::provider::PriceHistoryProvider;
use crate::ingest::types::PriceHistory;
use crate::rules::engine::{RuleEngine, SignalSet};
use crate::strategy::StrategyConfig;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Everything one run produces, handed to rendering/delivery as plain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub as_of_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub snapshots: Vec<InstrumentSnapshot>,
    pub categories: CategorySignals,
    pub earnings: Vec<SurpriseClassification>,
    pub recommendations: Vec<Recommendation>,
    pub highlights: Highlights,
    pub dropped: Vec<DataUnavailable>,
}

pub struct Pipeline {
    strategy: StrategyConfig,
    engine: RuleEngine,
    prices: Arc<dyn PriceHistoryProvider>,
    calendar: Arc<dyn EarningsCalendar>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        strategy: StrategyConfig,
        prices: Arc<dyn PriceHistoryProvider>,
        calendar: Arc<dyn EarningsCalendar>,
        concurrency: usize,
    ) -> Self {
        let engine = RuleEngine::from_strategy(&strategy);
        Self {
            strategy,
            engine,
            prices,
            calendar,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, as_of_date: NaiveDate) -> Result<RunReport, PipelineError> {
        let targets: Vec<(String, String)> = self
            .strategy
            .symbols()
            .map(|(c, s)| (c.to_string(), s.to_string()))
            .collect();
        let attempted = targets.len();

        tracing::info!(
            %as_of_date,
            symbols = attempted,
            provider = self.prices.provider_name(),
            concurrency = self.concurrency,
            "fetching price histories"
        );
        let histories = self.fetch_histories(&targets).await;

        let mut snapshots = Vec::with_capacity(attempted);
        let mut dropped = Vec::new();
        for ((category, symbol), history) in targets.iter().zip(histories) {
            match build_snapshot(symbol, category, history.name, &history.observations) {
                Ok(snap) => snapshots.push(snap),
                Err(err) => {
                    tracing::warn!(symbol = %symbol, error = %err, "dropping symbol");
                    dropped.push(err);
                }
            }
        }

        if snapshots.is_empty() {
            return Err(PipelineError::EmptyUniverse { attempted });
        }

        let categories = aggregate(&self.strategy.universe, &snapshots);
        let earnings = self.classify_earnings(&snapshots, as_of_date).await;
        let recommendations = self
            .engine
            .recommend(&SignalSet::new(&snapshots, &categories, &earnings));
        let highlights = highlights(&snapshots, &categories);

        tracing::info!(
            %as_of_date,
            snapshots = snapshots.len(),
            dropped = dropped.len(),
            categories = categories.len(),
            earnings = earnings.len(),
            recommendations = recommendations.len(),
            "run complete"
        );

        Ok(RunReport {
            run_id: uuid::Uuid::new_v4(),
            as_of_date,
            generated_at: Utc::now(),
            snapshots,
            categories,
            earnings,
            recommendations,
            highlights,
            dropped,
        })
    }

    /// Fetches all histories with at most `concurrency` requests in flight.
    /// The result is indexed like `targets`; failures become empty histories.
    async fn fetch_histories(&self, targets: &[(String, String)]) -> Vec<PriceHistory> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let window = self.strategy.history_window;
        let mut set = JoinSet::new();

        for (idx, (_, symbol)) in targets.iter().enumerate() {
            let prices = Arc::clone(&self.prices);
            let semaphore = Arc::clone(&semaphore);
            let symbol = symbol.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let res = prices.fetch_history(&symbol, window).await;
                (idx, symbol, res)
            });
        }

        let mut out = vec![PriceHistory::empty(); targets.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, _, Ok(history))) => out[idx] = history,
                Ok((_, symbol, Err(err))) => {
                    tracing::warn!(symbol = %symbol, error = %format!("{err:#}"), "price fetch failed; treating as no history");
                }
                Err(err) => {
                    tracing::error!(error = %err, "price fetch task aborted");
                }
            }
        }
        out
    }

    async fn classify_earnings(
        &self,
        snapshots: &[InstrumentSnapshot],
        as_of_date: NaiveDate,
    ) -> Vec<SurpriseClassification> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        for (idx, snap) in snapshots.iter().enumerate() {
            let calendar = Arc::clone(&self.calendar);
            let semaphore = Arc::clone(&semaphore);
            let symbol = snap.symbol.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (idx, calendar.fetch_upcoming_earnings(&symbol).await)
            });
        }

        let mut lookups: Vec<Option<EarningsLookup>> = vec![None; snapshots.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, fetched)) => {
                    lookups[idx] = Some(EarningsLookup::resolve(
                        &snapshots[idx].symbol,
                        fetched,
                        as_of_date,
                        self.strategy.earnings_window,
                    ));
                }
                Err(err) => tracing::error!(error = %err, "earnings lookup task aborted"),
            }
        }

        let mut out = Vec::new();
        for (snap, lookup) in snapshots.iter().zip(lookups) {
            match lookup {
                Some(EarningsLookup::Found(event)) => {
                    let classification = classify(&event, snap);
                    tracing::info!(
                        symbol = %snap.symbol,
                        class = ?classification.class,
                        days_until_report = event.days_until_report,
                        reaction = %classification.reaction_text,
                        "earnings classified"
                    );
                    out.push(classification);
                }
                Some(EarningsLookup::OutsideWindow { days_until_report }) => {
                    tracing::debug!(symbol = %snap.symbol, days_until_report, "earnings outside window");
                }
                Some(EarningsLookup::Failed(reason)) => {
                    tracing::warn!(symbol = %snap.symbol, error = %reason, "earnings lookup failed");
                }
                Some(EarningsLookup::NotFound) | None => {}
            }
        }
        out
    }
}
