//! Bar series validation and normalization.
//!
//! Applied to every successful fetch before date filtering:
//! - OHLC invariants (`low <= {open, close} <= high`)
//! - Finite, non-negative prices and volume
//! - Ascending, duplicate-free timestamps

use log::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::Bar;

/// Bar validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Whether to drop bars with negative or non-finite prices.
    pub reject_negative_prices: bool,
    /// Whether to drop bars where open/close fall outside low..high.
    pub reject_invalid_ohlc: bool,
    /// Whether to warn on zero volume.
    pub warn_on_zero_volume: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            reject_negative_prices: true,
            reject_invalid_ohlc: true,
            warn_on_zero_volume: false,
        }
    }
}

/// Bar validator.
#[derive(Clone, Debug, Default)]
pub struct BarValidator {
    config: ValidatorConfig,
}

impl BarValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a single bar.
    pub fn validate(&self, bar: &Bar) -> Result<(), MarketDataError> {
        let prices = [bar.open, bar.high, bar.low, bar.close];

        if self.config.reject_negative_prices
            && prices.iter().any(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(MarketDataError::ValidationFailed {
                message: format!(
                    "Invalid price in bar at {}: o={} h={} l={} c={}",
                    bar.time, bar.open, bar.high, bar.low, bar.close
                ),
            });
        }

        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(MarketDataError::ValidationFailed {
                message: format!("Invalid volume in bar at {}: {}", bar.time, bar.volume),
            });
        }

        if self.config.reject_invalid_ohlc && !bar.is_consistent() {
            return Err(MarketDataError::ValidationFailed {
                message: format!(
                    "OHLC out of range in bar at {}: o={} h={} l={} c={}",
                    bar.time, bar.open, bar.high, bar.low, bar.close
                ),
            });
        }

        if self.config.warn_on_zero_volume && bar.volume == 0.0 {
            warn!("Zero volume in bar at {}", bar.time);
        }

        Ok(())
    }

    /// Sort ascending by time, drop invalid bars and collapse duplicate
    /// timestamps (last occurrence wins).
    pub fn normalize(&self, symbol: &str, mut bars: Vec<Bar>) -> Vec<Bar> {
        let original_count = bars.len();
        // Stable, so duplicates keep their arrival order.
        bars.sort_by_key(|bar| bar.time);

        let mut normalized: Vec<Bar> = Vec::with_capacity(bars.len());
        let mut dropped = 0usize;
        for bar in bars {
            if let Err(e) = self.validate(&bar) {
                warn!("{}: dropping bar: {}", symbol, e);
                dropped += 1;
                continue;
            }
            match normalized.last_mut() {
                Some(last) if last.time == bar.time => *last = bar,
                _ => normalized.push(bar),
            }
        }

        let collapsed = original_count - dropped - normalized.len();
        if collapsed > 0 {
            debug!("{}: collapsed {} duplicate bar(s)", symbol, collapsed);
        }

        normalized
    }
}

/// Normalize with the default validator.
pub fn normalize_bars(symbol: &str, bars: Vec<Bar>) -> Vec<Bar> {
    BarValidator::new().normalize(symbol, bars)
}
