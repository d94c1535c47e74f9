//! Calendar-date windows over fetched bar series.

use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::{Bar, Timeframe};

const SECONDS_PER_DAY: i64 = 86_400;

/// Smallest bar count requested by the date-range wrapper.
pub const MIN_LOOKBACK_BARS: usize = 100;

/// Safety margin over the calendar estimate.
const LOOKBACK_MARGIN: f64 = 1.2;

/// Reject a window whose start is not before its end.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), MarketDataError> {
    if start >= end {
        return Err(MarketDataError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

/// 00:00 UTC of `date`, in seconds.
pub fn start_of_day(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Bounds `(from, to)` kept by [`filter_by_date_range`], both inclusive.
pub fn window_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    (start_of_day(start), start_of_day(end) + SECONDS_PER_DAY)
}

/// Keep bars with `start_of_day(start) <= time <= start_of_day(end) + 1 day`.
///
/// The whole of `end` is included, as is a bar stamped exactly at the
/// following midnight. No bars in range yields an empty vector.
pub fn filter_by_date_range(bars: &[Bar], start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let (from, to) = window_bounds(start, end);
    bars.iter()
        .filter(|bar| bar.time >= from && bar.time <= to)
        .cloned()
        .collect()
}

/// Bars to request so that the most recent `limit` bars reach back to `start`.
///
/// Calendar days from `start` to `today` inclusive, times the timeframe's
/// bars per day, plus 20%, never below [`MIN_LOOKBACK_BARS`].
pub fn estimate_lookback(timeframe: Timeframe, start: NaiveDate, today: NaiveDate) -> usize {
    let days = ((today - start).num_days() + 1).max(1) as f64;
    let estimate = (days * timeframe.bars_per_day() * LOOKBACK_MARGIN).ceil() as usize;
    estimate.max(MIN_LOOKBACK_BARS)
}
