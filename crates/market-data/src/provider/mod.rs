//! K-line provider abstractions and implementations.
//!
//! This module contains:
//! - The `KlineProvider` trait that every upstream source implements
//! - A token bucket `RateLimiter` each adapter owns
//! - Concrete adapters for East Money and Tencent
//!
//! Providers are selected by ordered list, never by branching on identity.
//! [`default_providers`] returns the standard East Money then Tencent chain.

mod rate_limiter;
mod time;
mod traits;

pub mod eastmoney;
pub mod tencent;

use std::sync::Arc;

use crate::errors::MarketDataError;

pub use eastmoney::EastMoneyProvider;
pub use rate_limiter::{RateLimit, RateLimiter};
pub use tencent::TencentProvider;
pub use traits::KlineProvider;

/// Ids accepted by [`provider_by_id`], in default priority order.
pub const PROVIDER_IDS: [&str; 2] = ["EASTMONEY", "TENCENT"];

/// The default ordered chain: East Money first, Tencent as fallback.
pub fn default_providers() -> Vec<Arc<dyn KlineProvider>> {
    vec![
        Arc::new(EastMoneyProvider::new()),
        Arc::new(TencentProvider::new()),
    ]
}

/// Resolve a provider id (case-insensitive) into a fresh adapter.
pub fn provider_by_id(id: &str) -> Result<Arc<dyn KlineProvider>, MarketDataError> {
    match id.trim().to_ascii_uppercase().as_str() {
        "EASTMONEY" => Ok(Arc::new(EastMoneyProvider::new())),
        "TENCENT" => Ok(Arc::new(TencentProvider::new())),
        other => Err(MarketDataError::UnknownProvider(other.to_string())),
    }
}

/// Resolve an ordered list of ids, keeping the given order.
pub fn providers_from_ids<S: AsRef<str>>(
    ids: &[S],
) -> Result<Vec<Arc<dyn KlineProvider>>, MarketDataError> {
    if ids.is_empty() {
        return Err(MarketDataError::InvalidInput(
            "at least one provider id is required".to_string(),
        ));
    }
    ids.iter().map(|id| provider_by_id(id.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_order() {
        let ids: Vec<_> = default_providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, PROVIDER_IDS);
    }

    #[test]
    fn test_provider_by_id_is_case_insensitive() {
        assert_eq!(provider_by_id("tencent").unwrap().id(), "TENCENT");
        assert_eq!(provider_by_id(" EastMoney ").unwrap().id(), "EASTMONEY");
    }

    #[test]
    fn test_unknown_provider() {
        let err = provider_by_id("SINA").err().unwrap();
        assert!(matches!(err, MarketDataError::UnknownProvider(ref id) if id == "SINA"));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_providers_from_ids_keeps_order() {
        let chain = providers_from_ids(&["TENCENT", "EASTMONEY"]).unwrap();
        let ids: Vec<_> = chain.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["TENCENT", "EASTMONEY"]);

        let empty: [&str; 0] = [];
        assert!(providers_from_ids(&empty).is_err());
    }
}
