//! Provider adapter trait definitions.
//!
//! This module defines the single fetch contract every upstream K-line
//! source implements. The failover chain selects adapters from an ordered
//! list, so adding a source never requires touching the orchestration code.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{ProviderResult, Timeframe};

/// Trait for upstream K-line providers.
///
/// # Contract
///
/// Ordinary upstream failures (HTTP errors, empty or rejected payloads) are
/// reported through `Ok(ProviderResult::failure(..))`. Only exceptional
/// conditions (transport errors, undecodable bodies) should come back as
/// `Err`. The retry controller treats both, and a panic, identically.
///
/// An empty but successful series is `Ok(ProviderResult::success(id, vec![], ..))`
/// and is not a failure.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use qtrd_market_data::provider::KlineProvider;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl KlineProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     async fn fetch(
///         &self,
///         symbol: &str,
///         timeframe: Timeframe,
///         limit: usize,
///     ) -> Result<ProviderResult, MarketDataError> {
///         // ... call the upstream
///     }
/// }
/// ```
#[async_trait]
pub trait KlineProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "EASTMONEY" or "TENCENT".
    /// Used for logging, diagnostics and `ProviderResult::source`.
    fn id(&self) -> &'static str;

    /// Whether this provider serves bars of the given period.
    ///
    /// The failover chain skips providers that return false.
    fn supports_timeframe(&self, timeframe: Timeframe) -> bool {
        let _ = timeframe;
        true
    }

    /// Fetch up to `limit` most recent bars for `symbol`, oldest first.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<ProviderResult, MarketDataError>;
}
