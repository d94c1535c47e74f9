//! Price adjustment for corporate actions.
//!
//! Raw A-share series jump at ex-dividend, split and rights-issue dates. A
//! gap between one bar's close and the next bar's open larger than
//! [`GAP_THRESHOLD`] is treated as such an event, and prices on one side of
//! it are rescaled so the series is continuous.
//!
//! - [`AdjustMode::Forward`] keeps the latest prices and rescales history.
//! - [`AdjustMode::Backward`] keeps the earliest prices and rescales later bars.
//!
//! Only `open`, `high`, `low` and `close` are rescaled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;
use crate::models::Bar;

/// Relative open-vs-prior-close gap above which a corporate action is assumed.
pub const GAP_THRESHOLD: f64 = 0.08;

/// Price adjustment basis.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode {
    /// Raw prices.
    #[default]
    None,
    /// Rescale history to the latest price level (qfq).
    #[serde(alias = "qfq")]
    Forward,
    /// Rescale later bars to the earliest price level (hfq).
    #[serde(alias = "hfq")]
    Backward,
}

impl AdjustMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AdjustMode::None => "none",
            AdjustMode::Forward => "forward",
            AdjustMode::Backward => "backward",
        }
    }
}

impl fmt::Display for AdjustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustMode {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "raw" => Ok(AdjustMode::None),
            "forward" | "qfq" => Ok(AdjustMode::Forward),
            "backward" | "hfq" => Ok(AdjustMode::Backward),
            _ => Err(MarketDataError::InvalidAdjustMode(s.to_string())),
        }
    }
}

/// A suspected corporate-action discontinuity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentPoint {
    /// Index of the first bar after the event.
    pub index: usize,
    /// Time of that bar.
    pub time: i64,
    /// `(open[index] - close[index - 1]) / close[index - 1]`
    pub gap: f64,
    /// `open[index] / close[index - 1]`
    pub factor: f64,
}

/// Find every index whose open gaps from the prior close by more than
/// [`GAP_THRESHOLD`]. Pairs where either the prior close or the open is not
/// a positive finite price are ignored, so every factor is positive.
pub fn detect_adjustment_points(bars: &[Bar]) -> Vec<AdjustmentPoint> {
    bars.windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let prev_close = pair[0].close;
            let open = pair[1].open;
            if !is_positive_price(prev_close) || !is_positive_price(open) {
                return None;
            }
            let gap = (open - prev_close) / prev_close;
            let factor = open / prev_close;
            (gap.abs() > GAP_THRESHOLD && is_positive_price(factor)).then(|| AdjustmentPoint {
                index: i + 1,
                time: pair[1].time,
                gap,
                factor,
            })
        })
        .collect()
}

fn is_positive_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Rewrite `bars` onto the requested basis. The input is never modified.
///
/// With no detected adjustment points the output is value-equal to the input.
pub fn adjust_prices(bars: &[Bar], mode: AdjustMode) -> Vec<Bar> {
    if mode == AdjustMode::None || bars.len() < 2 {
        return bars.to_vec();
    }

    let points = detect_adjustment_points(bars);
    if points.is_empty() {
        return bars.to_vec();
    }

    let multipliers = match mode {
        AdjustMode::Forward => forward_multipliers(bars.len(), &points),
        AdjustMode::Backward => backward_multipliers(bars.len(), &points),
        AdjustMode::None => return bars.to_vec(),
    };

    bars.iter()
        .zip(multipliers)
        .map(|(bar, m)| if m == 1.0 { bar.clone() } else { bar.scaled(m) })
        .collect()
}

/// Bar `i` gets the product of every factor at an index greater than `i`.
fn forward_multipliers(len: usize, points: &[AdjustmentPoint]) -> Vec<f64> {
    let mut multipliers = vec![1.0; len];
    let mut cumulative = 1.0;
    let mut pending = points.iter().rev().peekable();

    for i in (0..len).rev() {
        while let Some(point) = pending.next_if(|p| p.index > i) {
            cumulative *= point.factor;
        }
        multipliers[i] = cumulative;
    }
    multipliers
}

/// Bar `i` gets the product of every inverse factor at an index up to `i`.
fn backward_multipliers(len: usize, points: &[AdjustmentPoint]) -> Vec<f64> {
    let mut multipliers = vec![1.0; len];
    let mut cumulative = 1.0;
    let mut pending = points.iter().peekable();

    for (i, multiplier) in multipliers.iter_mut().enumerate() {
        while let Some(point) = pending.next_if(|p| p.index <= i) {
            cumulative /= point.factor;
        }
        *multiplier = cumulative;
    }
    multipliers
}
