//! Failover orchestrator.
//!
//! Walks an ordered provider list, giving each provider a full retry cycle
//! before falling through to the next one. The first success wins.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use super::diagnostics::{FetchDiagnostics, SkipReason};
use super::retry::{call_with_retry, RetryPolicy};
use crate::errors::MarketDataError;
use crate::models::{ProviderId, ProviderResult, Timeframe};
use crate::provider::KlineProvider;

/// Source recorded on the synthetic result when every provider is exhausted.
pub const ALL_SOURCES: &str = "ALL";

/// Result of a failover run plus the trace that produced it.
#[derive(Clone, Debug)]
pub struct FailoverOutcome {
    pub result: ProviderResult,
    pub diagnostics: FetchDiagnostics,
}

/// Ordered provider chain.
#[derive(Clone)]
pub struct FailoverChain {
    providers: Vec<Arc<dyn KlineProvider>>,
}

impl FailoverChain {
    pub fn new(providers: Vec<Arc<dyn KlineProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn KlineProvider>] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Fetch `symbol` from the first provider that succeeds.
    ///
    /// When every provider is exhausted the result is a failure from
    /// [`ALL_SOURCES`] carrying [`MarketDataError::AllSourcesFailed`], not the
    /// last provider's message.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        policy: &RetryPolicy,
        on_error: &(dyn Fn(&str, &str) + Send + Sync),
    ) -> FailoverOutcome {
        let started = Instant::now();
        let mut diagnostics = FetchDiagnostics::new();

        for (position, provider) in self.providers.iter().enumerate() {
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            if !provider.supports_timeframe(timeframe) {
                debug!(
                    "Provider '{}' does not serve {} bars, skipping for {}",
                    provider_id, timeframe, symbol
                );
                diagnostics.record_skip(
                    provider_id,
                    SkipReason::TimeframeNotSupported(timeframe),
                );
                continue;
            }

            let outcome = call_with_retry(policy, symbol, &provider_id, on_error, || {
                provider.fetch(symbol, timeframe, limit)
            })
            .await;

            if outcome.result.is_success() {
                if position > 0 {
                    info!(
                        "{}: using fallback source '{}' ({})",
                        symbol,
                        provider_id,
                        diagnostics.summary()
                    );
                } else {
                    debug!("{}: fetched from primary source '{}'", symbol, provider_id);
                }
                diagnostics.record_success(provider_id, outcome.attempts);
                return FailoverOutcome {
                    result: outcome.result,
                    diagnostics,
                };
            }

            let error = outcome
                .result
                .error()
                .unwrap_or("unknown error")
                .to_string();
            diagnostics.record_exhausted(provider_id, outcome.attempts, error);
        }

        warn!(
            "{}: {} [{}]",
            symbol,
            MarketDataError::AllSourcesFailed,
            diagnostics.summary()
        );

        FailoverOutcome {
            result: ProviderResult::failure(
                Cow::Borrowed(ALL_SOURCES),
                MarketDataError::AllSourcesFailed.to_string(),
                started.elapsed().as_millis() as u64,
            ),
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::models::Bar;

    struct Scripted {
        id: &'static str,
        succeed: bool,
        intraday: bool,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(id: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                id,
                succeed,
                intraday: true,
                calls: AtomicU32::new(0),
            })
        }

        fn daily_only(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                succeed: true,
                intraday: false,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl KlineProvider for Scripted {
        fn id(&self) -> &'static str {
            self.id
        }

        fn supports_timeframe(&self, timeframe: Timeframe) -> bool {
            self.intraday || !timeframe.is_intraday()
        }

        async fn fetch(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: usize,
        ) -> Result<ProviderResult, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(ProviderResult::success(
                    Cow::Borrowed(self.id),
                    vec![Bar::new(0, 1.0, 1.0, 1.0, 1.0, 1.0)],
                    1,
                ))
            } else {
                Err(MarketDataError::provider(self.id, "upstream down"))
            }
        }
    }

    fn ignore(_: &str, _: &str) {}

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_skips_secondary() {
        let primary = Scripted::new("A", true);
        let secondary = Scripted::new("B", true);
        let chain = FailoverChain::new(vec![primary.clone(), secondary.clone()]);

        let outcome = chain
            .fetch("600519", Timeframe::Day1, 10, &RetryPolicy::default(), &ignore)
            .await;

        assert!(outcome.result.is_success());
        assert_eq!(outcome.result.source().as_ref(), "A");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_through_after_exhausting_retries() {
        let primary = Scripted::new("A", false);
        let secondary = Scripted::new("B", true);
        let chain = FailoverChain::new(vec![primary.clone(), secondary.clone()]);

        let outcome = chain
            .fetch("600519", Timeframe::Day1, 10, &RetryPolicy::default(), &ignore)
            .await;

        assert!(outcome.result.is_success());
        assert_eq!(outcome.diagnostics.winner().map(|id| id.as_ref()), Some("B"));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 3);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_sentinel() {
        let chain = FailoverChain::new(vec![Scripted::new("A", false), Scripted::new("B", false)]);

        let outcome = chain
            .fetch("000001", Timeframe::Day1, 10, &RetryPolicy::no_retry(), &ignore)
            .await;

        assert!(!outcome.result.is_success());
        assert_eq!(outcome.result.error(), Some("All data sources failed"));
        assert_eq!(outcome.result.source().as_ref(), ALL_SOURCES);
        assert_eq!(outcome.diagnostics.total_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_timeframe_is_skipped() {
        let daily = Scripted::daily_only("DAILY");
        let chain = FailoverChain::new(vec![daily.clone(), Scripted::new("ANY", true)]);

        let outcome = chain
            .fetch("600519", Timeframe::Minute5, 10, &RetryPolicy::no_retry(), &ignore)
            .await;

        assert!(outcome.result.is_success());
        assert_eq!(daily.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.diagnostics.skip_reasons().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_fails() {
        let chain = FailoverChain::new(vec![]);
        let outcome = chain
            .fetch("600519", Timeframe::Day1, 10, &RetryPolicy::default(), &ignore)
            .await;
        assert!(!outcome.result.is_success());
        assert_eq!(outcome.diagnostics.summary(), "no providers configured");
    }
}
