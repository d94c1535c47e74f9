//! Multi-symbol fetching.
//!
//! [`BatchFetcher`] is the entry point: it deduplicates symbols, runs them
//! through the failover chain with bounded concurrency and a per-symbol
//! timeout, normalizes each series, applies the optional date window and
//! price adjustment, and returns a [`BatchResult`](crate::models::BatchResult).

mod date_range;
mod options;
mod scheduler;

pub use date_range::{
    estimate_lookback, filter_by_date_range, start_of_day, validate_date_range, window_bounds,
    MIN_LOOKBACK_BARS,
};
pub use options::{
    BatchOptions, ErrorCallback, ProgressCallback, DEFAULT_CONCURRENCY, DEFAULT_SYMBOL_TIMEOUT,
};
pub use scheduler::BatchFetcher;
