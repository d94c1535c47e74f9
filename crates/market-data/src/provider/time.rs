//! Timestamp parsing shared by the Chinese quote adapters.
//!
//! Upstreams report bar labels in Beijing time. Daily and longer bars are
//! keyed by their calendar date at 00:00 UTC so date-range filtering works on
//! plain calendar dates; intraday labels mark the bar close and are shifted
//! back by one period to get the period start.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use crate::models::Timeframe;

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// Convert an upstream bar label into the bar's period start (UTC seconds).
pub(crate) fn parse_bar_time(label: &str, timeframe: Timeframe) -> Option<i64> {
    let label = label.trim();

    if !timeframe.is_intraday() {
        let date = NaiveDate::parse_from_str(label.get(..10)?, "%Y-%m-%d").ok()?;
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }

    let naive = NaiveDateTime::parse_from_str(label, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(label, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(label, "%Y%m%d%H%M"))
        .ok()?;
    let beijing = FixedOffset::east_opt(BEIJING_OFFSET_SECS)?;
    let close_time = beijing.from_local_datetime(&naive).single()?.timestamp();

    Some(close_time - timeframe.duration_secs())
}
