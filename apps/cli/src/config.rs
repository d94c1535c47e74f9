use std::time::Duration;

use qtrd_market_data::batch::{BatchOptions, DEFAULT_CONCURRENCY, DEFAULT_SYMBOL_TIMEOUT};
use qtrd_market_data::provider::PROVIDER_IDS;
use qtrd_market_data::RetryPolicy;

/// Fetch settings read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub symbol_timeout: Duration,
    pub skip_empty: bool,
    /// Ordered provider ids, primary first.
    pub sources: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            symbol_timeout: DEFAULT_SYMBOL_TIMEOUT,
            skip_empty: true,
            sources: PROVIDER_IDS.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let concurrency = parsed("QTRD_CONCURRENCY")
            .map(|v| v as usize)
            .unwrap_or(defaults.concurrency);
        let max_retries = parsed("QTRD_MAX_RETRIES")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(defaults.retry.max_retries);
        let base_delay = parsed("QTRD_BASE_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.base_delay);
        let max_delay = parsed("QTRD_MAX_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.max_delay);
        let symbol_timeout = parsed("QTRD_SYMBOL_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.symbol_timeout);
        let skip_empty = lookup("QTRD_SKIP_EMPTY")
            .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            })
            .unwrap_or(defaults.skip_empty);
        let sources: Vec<String> = lookup("QTRD_SOURCES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            concurrency,
            retry: RetryPolicy {
                max_retries,
                base_delay,
                max_delay,
            },
            symbol_timeout,
            skip_empty,
            sources: if sources.is_empty() {
                defaults.sources
            } else {
                sources
            },
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::default()
            .with_concurrency(self.concurrency)
            .with_retry(self.retry.clone())
            .with_timeout(self.symbol_timeout)
            .with_skip_empty(self.skip_empty)
    }
}
