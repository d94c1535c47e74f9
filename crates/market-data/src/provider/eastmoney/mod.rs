//! East Money provider implementation.
//!
//! Fetches A-share K-lines from the East Money historical push service.
//!
//! # API Endpoint
//!
//! `https://push2his.eastmoney.com/api/qt/stock/kline/get?secid={market}.{code}&klt={period}&fqt=0&lmt={limit}&end=20500101&fields1=f1,f2,f3&fields2=f51,...,f57`
//!
//! `market` is `1` for Shanghai and `0` for Shenzhen. Each kline is a
//! comma-separated row: `date,open,close,high,low,volume,amount`, with
//! volume in lots of 100 shares.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{bare_code, Bar, Exchange, ProviderResult, Timeframe};
use crate::provider::rate_limiter::{RateLimit, RateLimiter};
use crate::provider::time::parse_bar_time;
use crate::provider::KlineProvider;

const BASE_URL: &str = "https://push2his.eastmoney.com";
const PROVIDER_ID: &str = "EASTMONEY";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shares per reported volume unit.
const SHARES_PER_LOT: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(default)]
    rc: i64,
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

/// Parsed payload: either bars or a provider-side rejection message.
#[derive(Debug, PartialEq)]
pub(crate) enum Payload {
    Bars(Vec<Bar>),
    Rejected(String),
}

/// East Money provider for A-share K-lines.
pub struct EastMoneyProvider {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl EastMoneyProvider {
    /// Create a provider against the public endpoint.
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Create a provider against a mirror or test server.
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

    /// Declared request budget for this upstream.
    pub fn rate_limit() -> RateLimit {
        RateLimit {
            requests_per_minute: 300,
            burst_capacity: 10.0,
        }
    }

    /// East Money `secid`: `{market}.{code}`.
    fn secid(symbol: &str) -> String {
        let market = match Exchange::from_symbol(symbol) {
            Exchange::Sse => 1,
            Exchange::Szse => 0,
        };
        format!("{}.{}", market, bare_code(symbol))
    }

    /// East Money `klt` period code.
    fn period_code(timeframe: Timeframe) -> u32 {
        match timeframe {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Minute30 => 30,
            Timeframe::Minute60 => 60,
            Timeframe::Day1 => 101,
            Timeframe::Week1 => 102,
            Timeframe::Month1 => 103,
        }
    }

    fn url(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> String {
        format!(
            "{}/api/qt/stock/kline/get?secid={}&klt={}&fqt=0&lmt={}&end=20500101\
             &fields1=f1,f2,f3&fields2=f51,f52,f53,f54,f55,f56,f57",
            self.base_url,
            Self::secid(symbol),
            Self::period_code(timeframe),
            limit
        )
    }

    /// Decode a response body into bars.
    pub(crate) fn parse_klines(
        body: &str,
        timeframe: Timeframe,
    ) -> Result<Payload, MarketDataError> {
        let response: KlineResponse = serde_json::from_str(body).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to parse response: {}", e))
        })?;

        if response.rc != 0 {
            return Ok(Payload::Rejected(format!(
                "API returned rc={}",
                response.rc
            )));
        }

        let Some(data) = response.data else {
            return Ok(Payload::Rejected("Symbol not found".to_string()));
        };

        let mut bars = Vec::with_capacity(data.klines.len());
        for (i, row) in data.klines.iter().enumerate() {
            match Self::parse_row(row, timeframe) {
                Some(bar) => bars.push(bar),
                None => warn!("Skipping kline at index {}: malformed row '{}'", i, row),
            }
        }

        Ok(Payload::Bars(bars))
    }

    fn parse_row(row: &str, timeframe: Timeframe) -> Option<Bar> {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() < 6 {
            return None;
        }

        let number = |i: usize| fields.get(i).and_then(|v| v.trim().parse::<f64>().ok());

        let time = parse_bar_time(fields[0], timeframe)?;
        let bar = Bar::new(
            time,
            number(1)?,
            number(3)?,
            number(4)?,
            number(2)?,
            number(5)? * SHARES_PER_LOT,
        );

        Some(match number(6) {
            Some(amount) => bar.with_amount(amount),
            None => bar,
        })
    }
}

impl Default for EastMoneyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KlineProvider for EastMoneyProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<ProviderResult, MarketDataError> {
        self.limiter.acquire().await;

        let url = self.url(symbol, timeframe, limit);
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

        match Self::parse_klines(&body, timeframe)? {
            Payload::Bars(bars) => {
                debug!(
                    "Fetched {} {} bars for {} from '{}'",
                    bars.len(),
                    timeframe,
                    symbol,
                    PROVIDER_ID
                );
                Ok(ProviderResult::success(PROVIDER_ID.into(), bars, latency))
            }
            Payload::Rejected(message) => Ok(ProviderResult::failure(
                PROVIDER_ID.into(),
                MarketDataError::provider(PROVIDER_ID, message).to_string(),
                latency,
            )),
        }
    }
}
