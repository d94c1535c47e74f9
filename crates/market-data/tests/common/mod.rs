#![allow(dead_code)]

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use qtrd_market_data::{Bar, KlineProvider, MarketDataError, ProviderResult, Timeframe};

pub const DAY: i64 = 86_400;

/// What a scripted provider does for a symbol.
#[derive(Clone, Debug)]
pub enum Behavior {
    Bars(Vec<Bar>),
    /// Reports `success=false` with this message.
    Report(String),
    /// Returns `Err`.
    Raise,
    Panic,
    /// Never completes.
    Hang,
}

/// Provider driven by a per-symbol script.
pub struct MockProvider {
    id: &'static str,
    default: Behavior,
    overrides: HashMap<String, Behavior>,
    delay: Duration,
    daily_only: bool,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: &'static str, default: Behavior) -> Self {
        Self {
            id,
            default,
            overrides: HashMap::new(),
            delay: Duration::ZERO,
            daily_only: false,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Always returns ten daily bars starting 2024-01-01.
    pub fn succeeding(id: &'static str) -> Self {
        Self::new(id, Behavior::Bars(daily_bars("2024-01-01", 10)))
    }

    pub fn failing(id: &'static str) -> Self {
        Self::new(id, Behavior::Report(format!("{} upstream unavailable", id)))
    }

    pub fn with_symbol(mut self, symbol: &str, behavior: Behavior) -> Self {
        self.overrides.insert(symbol.to_string(), behavior);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn daily_only(mut self) -> Self {
        self.daily_only = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == symbol)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KlineProvider for MockProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn supports_timeframe(&self, timeframe: Timeframe) -> bool {
        !self.daily_only || !timeframe.is_intraday()
    }

    async fn fetch(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _limit: usize,
    ) -> Result<ProviderResult, MarketDataError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = self.overrides.get(symbol).unwrap_or(&self.default).clone();
        match behavior {
            Behavior::Bars(bars) => Ok(ProviderResult::success(Cow::Borrowed(self.id), bars, 5)),
            Behavior::Report(message) => {
                Ok(ProviderResult::failure(Cow::Borrowed(self.id), message, 5))
            }
            Behavior::Raise => Err(MarketDataError::provider(self.id, "connection reset")),
            Behavior::Panic => panic!("{} decoder exploded", self.id),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// `count` consecutive daily bars, flat at 10.0, starting at `first`.
pub fn daily_bars(first: &str, count: i64) -> Vec<Bar> {
    let base = date(first).and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
    (0..count)
        .map(|i| Bar::new(base + i * DAY, 10.0, 10.2, 9.8, 10.0, 50_000.0))
        .collect()
}

pub fn as_providers(providers: &[Arc<MockProvider>]) -> Vec<Arc<dyn KlineProvider>> {
    providers
        .iter()
        .map(|p| p.clone() as Arc<dyn KlineProvider>)
        .collect()
}
