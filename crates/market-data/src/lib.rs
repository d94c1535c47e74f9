//! Batch K-line acquisition for A-share instruments.
//!
//! This crate retrieves historical price bars ("K-lines") for many symbols
//! from unreliable upstream HTTP sources and returns a single aggregated
//! result.
//!
//! # Overview
//!
//! - Multiple sources behind one trait, tried in order (East Money, Tencent)
//! - Bounded retries with exponential backoff per source
//! - Bounded concurrency with a per-symbol timeout
//! - Date-window filtering and forward/backward price adjustment
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  BatchFetcher    |  dedup, concurrency cap, per-symbol timeout
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  FailoverChain   |  ordered providers, first success wins
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | call_with_retry  |  exponential backoff, panics become failures
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  KlineProvider   |  EastMoney, Tencent, ...
//! +------------------+
//!          |
//!          v
//!   normalize -> date window -> adjust_prices -> BatchResult
//! ```
//!
//! # Example
//!
//! ```ignore
//! use qtrd_market_data::{BatchFetcher, BatchOptions, Timeframe};
//!
//! let fetcher = BatchFetcher::with_default_providers();
//! let result = fetcher
//!     .batch_fetch(&["600519", "000001"], Timeframe::Day1, 250, &BatchOptions::default())
//!     .await?;
//! println!("{} bars", result.statistics.total_klines);
//! ```

pub mod adjust;
pub mod batch;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use adjust::{
    adjust_prices, detect_adjustment_points, AdjustMode, AdjustmentPoint, GAP_THRESHOLD,
};
pub use batch::{
    estimate_lookback, filter_by_date_range, BatchFetcher, BatchOptions, ErrorCallback,
    ProgressCallback,
};
pub use errors::MarketDataError;
pub use models::{
    bare_code, Bar, BatchResult, BatchStatistics, Exchange, ProviderId, ProviderResult,
    SymbolCode, Timeframe,
};
pub use provider::{
    default_providers, provider_by_id, providers_from_ids, EastMoneyProvider, KlineProvider,
    RateLimit, RateLimiter, TencentProvider,
};
pub use registry::{
    normalize_bars, BarValidator, FailoverChain, FetchDiagnostics, RetryPolicy, SkipReason,
};
