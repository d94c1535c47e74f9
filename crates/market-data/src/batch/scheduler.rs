//! Batch scheduler: drives many symbols through the failover chain under a
//! concurrency cap and aggregates a [`BatchResult`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use super::date_range::{estimate_lookback, filter_by_date_range, validate_date_range};
use super::options::BatchOptions;
use crate::adjust::adjust_prices;
use crate::errors::{MarketDataError, Result};
use crate::models::{Bar, BatchResult, Timeframe};
use crate::provider::{default_providers, KlineProvider};
use crate::registry::{BarValidator, FailoverChain, FailoverOutcome};

/// Calendar window applied after fetching.
#[derive(Clone, Copy, Debug)]
struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

/// How one symbol settled.
enum Settled {
    Bars(Vec<Bar>),
    /// Succeeded but nothing is reported for it.
    Dropped,
    Failed(String),
}

fn ignore_error(_: &str, _: &str) {}

/// Multi-symbol K-line fetcher.
///
/// Holds only the ordered provider chain; every call builds its result from
/// scratch and hands it to the caller.
#[derive(Clone)]
pub struct BatchFetcher {
    chain: FailoverChain,
    validator: BarValidator,
}

impl BatchFetcher {
    /// Create a fetcher over an ordered provider list (primary first).
    pub fn new(providers: Vec<Arc<dyn KlineProvider>>) -> Self {
        Self {
            chain: FailoverChain::new(providers),
            validator: BarValidator::new(),
        }
    }

    /// East Money first, Tencent as fallback.
    pub fn with_default_providers() -> Self {
        Self::new(default_providers())
    }

    /// Replace the bar validator used for normalization.
    pub fn with_validator(mut self, validator: BarValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn chain(&self) -> &FailoverChain {
        &self.chain
    }

    /// Fetch the most recent `limit` bars for every distinct symbol.
    ///
    /// Per-symbol failures end up in `BatchResult::errors`. Only malformed
    /// input (blank symbols, zero limit, no providers) returns `Err`.
    pub async fn batch_fetch<S: AsRef<str>>(
        &self,
        symbols: &[S],
        timeframe: Timeframe,
        limit: usize,
        options: &BatchOptions,
    ) -> Result<BatchResult> {
        let symbols = dedupe_symbols(symbols)?;
        if symbols.is_empty() {
            return Ok(BatchResult::empty());
        }
        self.check_ready(limit)?;

        Ok(self.run(symbols, timeframe, limit, options, None).await)
    }

    /// Fetch enough history to cover `start..=end`, then keep only bars in
    /// that window.
    ///
    /// Symbols left with no bars after filtering are omitted from both
    /// `data` and `errors`.
    pub async fn batch_fetch_with_date_range<S: AsRef<str>>(
        &self,
        symbols: &[S],
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
        options: &BatchOptions,
    ) -> Result<BatchResult> {
        validate_date_range(start, end)?;

        let symbols = dedupe_symbols(symbols)?;
        if symbols.is_empty() {
            return Ok(BatchResult::empty());
        }

        let today = Utc::now().date_naive().max(end);
        let limit = estimate_lookback(timeframe, start, today);
        self.check_ready(limit)?;
        debug!(
            "Requesting {} {} bars per symbol to cover {}..={}",
            limit, timeframe, start, end
        );

        let window = DateWindow { start, end };
        Ok(self
            .run(symbols, timeframe, limit, options, Some(window))
            .await)
    }

    fn check_ready(&self, limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(MarketDataError::InvalidInput(
                "limit must be at least 1".to_string(),
            ));
        }
        if self.chain.is_empty() {
            return Err(MarketDataError::InvalidInput(
                "no providers configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn run(
        &self,
        symbols: Vec<String>,
        timeframe: Timeframe,
        limit: usize,
        options: &BatchOptions,
        window: Option<DateWindow>,
    ) -> BatchResult {
        let started = Instant::now();
        let total = symbols.len();
        let concurrency = options.effective_concurrency();
        let on_error: &(dyn Fn(&str, &str) + Send + Sync) =
            options.on_error.as_deref().unwrap_or(&ignore_error);

        info!(
            "Fetching {} {} series for {} symbol(s) with concurrency {}",
            limit, timeframe, total, concurrency
        );

        let chain = &self.chain;
        let tasks = symbols.iter().map(|symbol| async move {
            // The budget starts on first poll, once a concurrency slot is free.
            let outcome = tokio::time::timeout(
                options.timeout,
                chain.fetch(symbol, timeframe, limit, &options.retry, on_error),
            )
            .await;
            (symbol, outcome)
        });
        let mut completions = stream::iter(tasks).buffer_unordered(concurrency);

        let mut result = BatchResult::empty();
        result.statistics.total_symbols = total;
        let mut completed = 0;

        while let Some((symbol, outcome)) = completions.next().await {
            let settled = match outcome {
                Ok(failover) => self.settle(symbol, failover, options, window),
                Err(_) => {
                    let error = MarketDataError::SymbolTimeout {
                        symbol: symbol.clone(),
                        timeout_ms: options.timeout.as_millis() as u64,
                    };
                    warn!("{}", error);
                    Settled::Failed(error.to_string())
                }
            };

            match settled {
                Settled::Bars(bars) => {
                    result.statistics.success_count += 1;
                    result.data.insert(symbol.clone(), bars);
                }
                Settled::Dropped => {
                    result.statistics.success_count += 1;
                }
                Settled::Failed(error) => {
                    result.errors.insert(symbol.clone(), error);
                }
            }

            completed += 1;
            if let Some(on_progress) = &options.on_progress {
                on_progress(completed, total, symbol);
            }
        }

        result.statistics.failed_count = result.errors.len();
        result.recount_klines();
        result.statistics.total_time = started.elapsed().as_millis() as u64;

        let stats = &result.statistics;
        info!(
            "Batch complete: {}/{} succeeded, {} failed, {} bars in {}ms",
            stats.success_count,
            stats.total_symbols,
            stats.failed_count,
            stats.total_klines,
            stats.total_time
        );

        result
    }

    /// Normalize, window and adjust one symbol's fetched series.
    fn settle(
        &self,
        symbol: &str,
        outcome: FailoverOutcome,
        options: &BatchOptions,
        window: Option<DateWindow>,
    ) -> Settled {
        let raw = match outcome.result.into_outcome() {
            Ok(bars) => bars,
            Err(error) => return Settled::Failed(error),
        };

        let mut bars = self.validator.normalize(symbol, raw);

        if let Some(DateWindow { start, end }) = window {
            bars = filter_by_date_range(&bars, start, end);
            if bars.is_empty() {
                debug!("{}: no bars between {} and {}", symbol, start, end);
                return Settled::Dropped;
            }
        }

        if bars.is_empty() && options.skip_empty {
            debug!("{}: empty series skipped", symbol);
            return Settled::Dropped;
        }

        Settled::Bars(adjust_prices(&bars, options.adjust))
    }
}

/// Trim and deduplicate, keeping first-occurrence order.
fn dedupe_symbols<S: AsRef<str>>(symbols: &[S]) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(symbols.len());
    let mut unique = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(MarketDataError::InvalidInput(
                "symbol list contains a blank entry".to_string(),
            ));
        }
        if seen.insert(symbol) {
            unique.push(symbol.to_string());
        }
    }

    Ok(unique)
}
