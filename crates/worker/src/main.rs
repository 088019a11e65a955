use anyhow::Context;
use clap::Parser;
use overnight_core::ingest::earnings::{EarningsCalendar, HttpEarningsCalendar, NoEarningsCalendar};
use overnight_core::ingest::fixture::FixtureMarketData;
use overnight_core::ingest::provider::{PriceHistoryProvider, YahooChartProvider};
use overnight_core::pipeline::Pipeline;
use overnight_core::strategy::StrategyConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Debug, Parser)]
#[command(name = "overnight_worker")]
struct Args {
    /// US session date (YYYY-MM-DD). Defaults to the most recent completed session.
    #[arg(long)]
    as_of_date: Option<String>,

    /// Strategy JSON (categories, rules, target prices). Overrides STRATEGY_PATH.
    #[arg(long)]
    strategy: Option<PathBuf>,

    /// Read prices and earnings from a fixture file instead of the network.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Write the run report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit single-line JSON.
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = overnight_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = run(&settings, &args).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "overnight run failed");
    }
    res
}

async fn run(settings: &overnight_core::config::Settings, args: &Args) -> anyhow::Result<()> {
    let as_of_date = overnight_core::time::us_market::resolve_as_of_date(
        args.as_of_date.as_deref(),
        chrono::Utc::now(),
    )?;

    let strategy = match args
        .strategy
        .clone()
        .or_else(|| settings.strategy_path.clone().map(PathBuf::from))
    {
        Some(path) => StrategyConfig::from_path(&path)?,
        None => StrategyConfig::embedded_default()?,
    };

    let (prices, calendar) = build_collaborators(settings, args.fixtures.as_deref())?;

    tracing::info!(
        %as_of_date,
        prices = prices.provider_name(),
        earnings = calendar.provider_name(),
        categories = strategy.universe.len(),
        rules = strategy.rules.len(),
        "starting overnight run"
    );

    let pipeline = Pipeline::new(strategy, prices, calendar, settings.fetch_concurrency());
    let report = pipeline
        .run(as_of_date)
        .await
        .context("overnight pipeline failed")?;

    output::write_report(&report, args.output.as_deref(), !args.compact)?;

    tracing::info!(
        %as_of_date,
        run_id = %report.run_id,
        recommendations = report.recommendations.len(),
        "report written"
    );
    Ok(())
}

fn build_collaborators(
    settings: &overnight_core::config::Settings,
    fixtures: Option<&Path>,
) -> anyhow::Result<(Arc<dyn PriceHistoryProvider>, Arc<dyn EarningsCalendar>)> {
    if let Some(path) = fixtures {
        let fx = Arc::new(FixtureMarketData::from_path(path)?);
        let prices: Arc<dyn PriceHistoryProvider> = fx.clone();
        let calendar: Arc<dyn EarningsCalendar> = fx;
        return Ok((prices, calendar));
    }

    let prices: Arc<dyn PriceHistoryProvider> = Arc::new(YahooChartProvider::from_settings(settings)?);
    let calendar: Arc<dyn EarningsCalendar> = match HttpEarningsCalendar::from_settings(settings)? {
        Some(calendar) => Arc::new(calendar),
        None => {
            tracing::info!("EARNINGS_PROVIDER_BASE_URL not set; skipping earnings lookups");
            Arc::new(NoEarningsCalendar)
        }
    };
    Ok((prices, calendar))
}

fn init_sentry(settings: &overnight_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
