use std::fmt;

use serde::{Deserialize, Serialize};

/// Mainland China stock exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Exchange {
    /// Shanghai Stock Exchange
    Sse,
    /// Shenzhen Stock Exchange
    Szse,
}

impl Exchange {
    /// Infer the exchange for an A-share code.
    ///
    /// Explicit markers win: `600519.SH`, `sh600519`, `000001.SZ`, `sz000001`.
    /// Bare six-digit codes starting with 6, 5 or 9 are listed in Shanghai;
    /// everything else is treated as Shenzhen.
    pub fn from_symbol(symbol: &str) -> Self {
        let lower = symbol.trim().to_ascii_lowercase();

        if lower.starts_with("sh") || lower.ends_with(".sh") || lower.ends_with(".sse") {
            return Self::Sse;
        }
        if lower.starts_with("sz") || lower.ends_with(".sz") || lower.ends_with(".szse") {
            return Self::Szse;
        }

        match lower.chars().next() {
            Some('6') | Some('5') | Some('9') => Self::Sse,
            _ => Self::Szse,
        }
    }

    /// Two-letter market prefix used by most Chinese quote services.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Sse => "sh",
            Self::Szse => "sz",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sse => write!(f, "SSE"),
            Self::Szse => write!(f, "SZSE"),
        }
    }
}

/// Strip exchange markers and return the bare numeric code.
///
/// `"sh600519"`, `"600519.SH"` and `"600519"` all yield `"600519"`.
pub fn bare_code(symbol: &str) -> &str {
    let trimmed = symbol.trim();
    let without_suffix = trimmed.split('.').next().unwrap_or(trimmed);
    let lower_prefix = without_suffix
        .get(..2)
        .map(|p| p.eq_ignore_ascii_case("sh") || p.eq_ignore_ascii_case("sz"))
        .unwrap_or(false);
    if lower_prefix {
        &without_suffix[2..]
    } else {
        without_suffix
    }
}
