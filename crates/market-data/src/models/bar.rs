use serde::{Deserialize, Serialize};

/// One OHLCV observation ("K-line") for a fixed period.
///
/// `time` is the period start in UTC seconds. Prices are in currency units,
/// `volume` in shares/contracts, `amount` the traded value when the provider
/// reports it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl Bar {
    /// Create a bar without a traded amount.
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
            amount: None,
        }
    }

    /// Attach the traded amount.
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Whether `low <= {open, close} <= high` holds and all prices are finite
    /// and non-negative.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return false;
        }
        self.low <= self.high
            && self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }

    /// Multiply the four price fields by `factor`. Volume and amount are kept.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            time: self.time,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            volume: self.volume,
            amount: self.amount,
        }
    }
}
