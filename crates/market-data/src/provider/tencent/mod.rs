//! Tencent quote provider.
//!
//! Uses the `fqkline` endpoint on `web.ifzq.gtimg.cn`, which only serves
//! daily, weekly and monthly bars. Rows are arrays of strings in the order
//! `date, open, close, high, low, volume`, with trailing fields that vary by
//! symbol and are ignored.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::models::{bare_code, Bar, Exchange, ProviderResult, Timeframe};
use crate::provider::rate_limiter::{RateLimit, RateLimiter};
use crate::provider::time::parse_bar_time;
use crate::provider::KlineProvider;

const BASE_URL: &str = "https://web.ifzq.gtimg.cn";
const PROVIDER_ID: &str = "TENCENT";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SHARES_PER_LOT: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct FqKlineResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<serde_json::Map<String, Value>>,
}

/// Tencent daily/weekly/monthly K-line provider.
pub struct TencentProvider {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl TencentProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(PROVIDER_ID, &Self::rate_limit()),
        }
    }

    pub fn rate_limit() -> RateLimit {
        RateLimit {
            requests_per_minute: 120,
            burst_capacity: 5.0,
        }
    }

    /// Tencent symbol key, e.g. `sh600519`.
    fn qualified_symbol(symbol: &str) -> String {
        format!(
            "{}{}",
            Exchange::from_symbol(symbol).prefix(),
            bare_code(symbol)
        )
    }

    fn period_key(timeframe: Timeframe) -> Option<&'static str> {
        match timeframe {
            Timeframe::Day1 => Some("day"),
            Timeframe::Week1 => Some("week"),
            Timeframe::Month1 => Some("month"),
            _ => None,
        }
    }

    fn url(&self, key: &str, period: &str, limit: usize) -> String {
        format!(
            "{}/appstock/app/fqkline/get?param={},{},,,{},",
            self.base_url, key, period, limit
        )
    }

    /// Decode a response body. The inner `Err` carries an upstream rejection
    /// or a missing symbol entry.
    pub(crate) fn parse_klines(
        body: &str,
        key: &str,
        timeframe: Timeframe,
    ) -> Result<Result<Vec<Bar>, String>, MarketDataError> {
        let period = Self::period_key(timeframe)
            .ok_or_else(|| MarketDataError::InvalidTimeframe(timeframe.to_string()))?;

        let response: FqKlineResponse = serde_json::from_str(body).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to parse response: {}", e))
        })?;

        if response.code != 0 {
            return Ok(Err(format!(
                "API returned code={} {}",
                response.code, response.msg
            )));
        }

        let Some(entry) = response.data.as_ref().and_then(|data| data.get(key)) else {
            return Ok(Err("Symbol not found".to_string()));
        };

        let rows = match entry.get(period) {
            Some(rows) => rows.as_array().cloned().unwrap_or_default(),
            // `qfq{period}` rows are forward-adjusted and must not pass as raw bars.
            None if entry.get(format!("qfq{}", period).as_str()).is_some() => {
                return Ok(Err(format!("No raw {} series, only adjusted rows", period)));
            }
            None => Vec::new(),
        };

        let mut bars = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row.as_array().and_then(|fields| Self::parse_row(fields, timeframe)) {
                Some(bar) => bars.push(bar),
                None => warn!("Skipping kline at index {} for {}: malformed row", i, key),
            }
        }

        Ok(Ok(bars))
    }

    fn parse_row(fields: &[Value], timeframe: Timeframe) -> Option<Bar> {
        let number = |i: usize| -> Option<f64> {
            match fields.get(i)? {
                Value::String(s) => s.trim().parse().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            }
        };

        let time = parse_bar_time(fields.first()?.as_str()?, timeframe)?;
        Some(Bar::new(
            time,
            number(1)?,
            number(3)?,
            number(4)?,
            number(2)?,
            number(5)? * SHARES_PER_LOT,
        ))
    }
}

impl Default for TencentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KlineProvider for TencentProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports_timeframe(&self, timeframe: Timeframe) -> bool {
        Self::period_key(timeframe).is_some()
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<ProviderResult, MarketDataError> {
        let period = Self::period_key(timeframe)
            .ok_or_else(|| MarketDataError::InvalidTimeframe(timeframe.to_string()))?;

        self.limiter.acquire().await;

        let key = Self::qualified_symbol(symbol);
        let url = self.url(&key, period, limit);
        let started = Instant::now();

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let latency = started.elapsed().as_millis() as u64;
            let error = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::provider(PROVIDER_ID, format!("HTTP error: {}", status))
            };
            return Ok(ProviderResult::failure(
                PROVIDER_ID.into(),
                error.to_string(),
                latency,
            ));
        }

        let body = response.text().await?;
        let latency = started.elapsed().as_millis() as u64;

        match Self::parse_klines(&body, &key, timeframe)? {
            Ok(bars) => {
                debug!(
                    "Fetched {} {} bars for {} from '{}'",
                    bars.len(),
                    timeframe,
                    key,
                    PROVIDER_ID
                );
                Ok(ProviderResult::success(PROVIDER_ID.into(), bars, latency))
            }
            Err(message) => Ok(ProviderResult::failure(
                PROVIDER_ID.into(),
                MarketDataError::provider(PROVIDER_ID, message).to_string(),
                latency,
            )),
        }
    }
}
