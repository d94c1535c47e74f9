//! Error types for the market data crate.
//!
//! [`MarketDataError`] is used in two roles:
//! - As the `Err` side of the batch entry points, only for malformed input
//!   that cannot be attributed to a single symbol.
//! - As the exceptional path of a provider `fetch` call. The retry
//!   controller converts these into failed [`ProviderResult`]s, so they never
//!   escape a batch.
//!
//! [`ProviderResult`]: crate::models::ProviderResult

use thiserror::Error;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The caller passed arguments that make the whole request meaningless.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A range query whose start is not before its end.
    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidDateRange {
        /// Requested start date
        start: String,
        /// Requested end date
        end: String,
    },

    /// The timeframe string is not one of the supported bar periods.
    #[error("Unsupported timeframe: {0}")]
    InvalidTimeframe(String),

    /// The adjustment mode string is not recognized.
    #[error("Unsupported adjustment mode: {0}")]
    InvalidAdjustMode(String),

    /// No adapter is registered under the requested id.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The HTTP request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// A bar failed validation.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// What was wrong with the bar
        message: String,
    },

    /// A symbol's whole orchestration exceeded its wall-clock budget.
    #[error("Timeout: {symbol} did not complete within {timeout_ms}ms")]
    SymbolTimeout {
        /// The symbol that timed out
        symbol: String,
        /// The budget that was exceeded
        timeout_ms: u64,
    },

    /// Every configured provider was exhausted for a symbol.
    #[error("All data sources failed")]
    AllSourcesFailed,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Shorthand for [`MarketDataError::ProviderError`].
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error rejects the whole call rather than a single symbol.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidDateRange { .. }
                | Self::InvalidTimeframe(_)
                | Self::InvalidAdjustMode(_)
                | Self::UnknownProvider(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarketDataError>;
