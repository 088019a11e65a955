use crate::config::Settings;
use crate::ingest::types::{ChartResponse, PriceHistory};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 10;
// Backoff doubles from 1s and stops growing at 2^6 = 64s.
const MAX_BACKOFF_SHIFT: u32 = 6;
const CHART_PATH: &str = "/v8/finance/chart";
const CLIENT_USER_AGENT: &str = "Mozilla/5.0 (compatible; overnight/0.1)";

#[async_trait::async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily closes and volumes for the last `window` sessions, oldest first.
    async fn fetch_history(&self, symbol: &str, window: usize) -> Result<PriceHistory>;
}

#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl YahooChartProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                settings.price_provider_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .default_headers(headers)
            .build()
            .context("failed to build price provider http client")?;

        Ok(Self {
            http,
            base_url: settings.price_provider_base_url().to_string(),
            retries: settings.price_provider_retries.unwrap_or(DEFAULT_RETRIES).clamp(1, MAX_RETRIES),
        })
    }

    fn url(&self, symbol: &str) -> String {
        format!("{}{}/{}", self.base_url.trim_end_matches('/'), CHART_PATH, symbol)
    }

    async fn fetch_once(&self, symbol: &str, window: usize) -> Result<PriceHistory> {
        let res = self
            .http
            .get(self.url(symbol))
            .query(&[("range", format!("{window}d")), ("interval", "1d".to_string())])
            .send()
            .await
            .context("price provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read price provider response")?;
        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .with_context(|| format!("price provider response is not a chart payload (HTTP {status}): {text}"))?;

        if let Some(err) = parsed.chart.error {
            anyhow::bail!(
                "price provider error for {symbol}: {} {}",
                err.code,
                err.description.unwrap_or_default()
            );
        }
        if !status.is_success() {
            anyhow::bail!("price provider HTTP {status} for {symbol}");
        }

        let history = parsed
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .map(|r| r.into_history())
            .unwrap_or_else(PriceHistory::empty);

        Ok(history.truncate_to(window))
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for YahooChartProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_history(&self, symbol: &str, window: usize) -> Result<PriceHistory> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(symbol, window).await {
                Ok(history) => return Ok(history),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_for(attempt);
                    tracing::warn!(symbol, attempt, ?backoff, error = %err, "price fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT))
}
