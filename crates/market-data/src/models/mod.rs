//! Market data models
//!
//! This module contains the shared data shapes every provider and consumer
//! agrees on:
//! - `types` - Type aliases for common identifiers (ProviderId, SymbolCode)
//! - `bar` - One OHLCV observation (Bar)
//! - `envelope` - Uniform provider response (ProviderResult)
//! - `batch` - Multi-symbol output (BatchResult, BatchStatistics)
//! - `timeframe` - Bar period (Timeframe)
//! - `exchange` - A-share exchange inference (Exchange)

mod bar;
mod batch;
mod envelope;
mod exchange;
mod timeframe;
mod types;

pub use bar::Bar;
pub use batch::{BatchResult, BatchStatistics};
pub use envelope::ProviderResult;
pub use exchange::{bare_code, Exchange};
pub use timeframe::{Timeframe, SESSION_MINUTES_PER_DAY};
pub use types::{ProviderId, SymbolCode};
