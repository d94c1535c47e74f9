use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Trading minutes in one A-share session day (09:30-11:30, 13:00-15:00).
pub const SESSION_MINUTES_PER_DAY: u32 = 240;

/// Bar period.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "60m")]
    Minute60,
    #[default]
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
    #[serde(rename = "1M")]
    Month1,
}

impl Timeframe {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Minute60 => "60m",
            Self::Day1 => "1d",
            Self::Week1 => "1w",
            Self::Month1 => "1M",
        }
    }

    /// Minutes per bar for intraday periods.
    pub const fn intraday_minutes(self) -> Option<u32> {
        match self {
            Self::Minute1 => Some(1),
            Self::Minute5 => Some(5),
            Self::Minute15 => Some(15),
            Self::Minute30 => Some(30),
            Self::Minute60 => Some(60),
            Self::Day1 | Self::Week1 | Self::Month1 => None,
        }
    }

    pub const fn is_intraday(self) -> bool {
        self.intraday_minutes().is_some()
    }

    /// Nominal length of one bar in seconds (months counted as 30 days).
    pub const fn duration_secs(self) -> i64 {
        match self.intraday_minutes() {
            Some(minutes) => minutes as i64 * 60,
            None => match self {
                Self::Week1 => 7 * 86_400,
                Self::Month1 => 30 * 86_400,
                _ => 86_400,
            },
        }
    }

    /// Expected bars per calendar day.
    pub fn bars_per_day(self) -> f64 {
        match self {
            Self::Week1 => 1.0 / 7.0,
            Self::Month1 => 1.0 / 30.0,
            Self::Day1 => 1.0,
            intraday => {
                let minutes = intraday.intraday_minutes().unwrap_or(SESSION_MINUTES_PER_DAY);
                f64::from(SESSION_MINUTES_PER_DAY / minutes)
            }
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // "1m" and "1M" differ only by case, so match them before lowercasing.
        match trimmed {
            "1m" => return Ok(Self::Minute1),
            "1M" => return Ok(Self::Month1),
            _ => {}
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "1min" => Ok(Self::Minute1),
            "5m" | "5min" => Ok(Self::Minute5),
            "15m" | "15min" => Ok(Self::Minute15),
            "30m" | "30min" => Ok(Self::Minute30),
            "60m" | "60min" | "1h" => Ok(Self::Minute60),
            "1d" | "d" | "day" | "daily" => Ok(Self::Day1),
            "1w" | "w" | "week" | "weekly" => Ok(Self::Week1),
            "1mo" | "month" | "monthly" => Ok(Self::Month1),
            _ => Err(MarketDataError::InvalidTimeframe(s.to_string())),
        }
    }
}
