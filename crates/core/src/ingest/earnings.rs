use crate::config::Settings;
use crate::domain::earnings::EarningsRecord;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const EARNINGS_PATH: &str = "/v1/earnings";

#[async_trait::async_trait]
pub trait EarningsCalendar: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Next (or most recent) earnings entry for `symbol`, if the calendar has one.
    async fn fetch_upcoming_earnings(&self, symbol: &str) -> Result<Option<EarningsRecord>>;
}

/// Used when no calendar is configured; every lookup is "not found".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEarningsCalendar;

#[async_trait::async_trait]
impl EarningsCalendar for NoEarningsCalendar {
    fn provider_name(&self) -> &'static str {
        "none"
    }

    async fn fetch_upcoming_earnings(&self, _symbol: &str) -> Result<Option<EarningsRecord>> {
        Ok(None)
    }
}

/// JSON calendar endpoint: `GET {base}/v1/earnings/{symbol}` answering an
/// [`EarningsRecord`], `null`, or 404.
#[derive(Debug, Clone)]
pub struct HttpEarningsCalendar {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEarningsCalendar {
    /// `None` when `EARNINGS_PROVIDER_BASE_URL` is unset.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        let Some(base_url) = settings.earnings_provider_base_url.clone() else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build earnings calendar http client")?;

        Ok(Some(Self {
            http,
            base_url,
            api_key: settings.earnings_provider_api_key.clone(),
        }))
    }

    fn url(&self, symbol: &str) -> String {
        format!("{}{}/{}", self.base_url.trim_end_matches('/'), EARNINGS_PATH, symbol)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl EarningsCalendar for HttpEarningsCalendar {
    fn provider_name(&self) -> &'static str {
        "http_json_earnings"
    }

    async fn fetch_upcoming_earnings(&self, symbol: &str) -> Result<Option<EarningsRecord>> {
        let res = self
            .http
            .get(self.url(symbol))
            .headers(self.headers()?)
            .send()
            .await
            .context("earnings calendar request failed")?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = res
            .text()
            .await
            .context("failed to read earnings calendar response")?;
        if !status.is_success() {
            anyhow::bail!("earnings calendar HTTP {status}: {text}");
        }

        parse_record(&text)
    }
}

fn parse_record(text: &str) -> Result<Option<EarningsRecord>> {
    serde_json::from_str::<Option<EarningsRecord>>(text)
        .with_context(|| format!("earnings calendar response is not a valid record: {text}"))
}
