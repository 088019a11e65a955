pub mod domain;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod rules;
pub mod strategy;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_PRICE_PROVIDER_BASE_URL: &str = "https://query1.finance.yahoo.com";
    pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub price_provider_base_url: Option<String>,
        pub price_provider_timeout_secs: Option<u64>,
        pub price_provider_retries: Option<u32>,
        pub earnings_provider_base_url: Option<String>,
        pub earnings_provider_api_key: Option<String>,
        pub strategy_path: Option<String>,
        pub fetch_concurrency: Option<usize>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                price_provider_base_url: non_empty_var("PRICE_PROVIDER_BASE_URL"),
                price_provider_timeout_secs: parsed_var("PRICE_PROVIDER_TIMEOUT_SECS")?,
                price_provider_retries: parsed_var("PRICE_PROVIDER_RETRIES")?,
                earnings_provider_base_url: non_empty_var("EARNINGS_PROVIDER_BASE_URL"),
                earnings_provider_api_key: non_empty_var("EARNINGS_PROVIDER_API_KEY"),
                strategy_path: non_empty_var("STRATEGY_PATH"),
                fetch_concurrency: parsed_var("FETCH_CONCURRENCY")?,
            })
        }

        pub fn price_provider_base_url(&self) -> &str {
            self.price_provider_base_url
                .as_deref()
                .unwrap_or(DEFAULT_PRICE_PROVIDER_BASE_URL)
        }

        pub fn fetch_concurrency(&self) -> usize {
            self.fetch_concurrency
                .unwrap_or(DEFAULT_FETCH_CONCURRENCY)
                .max(1)
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn parsed_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(key)
            .map(|s| s.trim().parse::<T>().with_context(|| format!("{key} is not valid: {s:?}")))
            .transpose()
    }
}
