//! Retry controller: bounded retries with exponential backoff around a
//! single provider call.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;
use crate::models::{ProviderId, ProviderResult};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default cap on any single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Backoff policy for one provider's retry cycle.
///
/// Total attempts = `max_retries + 1`. Delays serialize as milliseconds:
///
/// ```json
/// { "maxRetries": 2, "baseDelay": 1000, "maxDelay": 10000 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the failed attempt with 0-based index `attempt`:
    /// `min(base_delay * 2^attempt, max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Final state of one provider's retry cycle.
#[derive(Clone, Debug)]
pub struct RetryOutcome {
    /// The first success, or the last failure unchanged.
    pub result: ProviderResult,
    /// Calls actually made.
    pub attempts: u32,
}

/// Drive `call` until it reports success or `policy` is exhausted.
///
/// An `Err` or a panic from `call` is converted into a failed
/// [`ProviderResult`] attributed to `source`, and retried like a reported
/// failure. `on_error(symbol, error)` runs once per failed attempt.
pub async fn call_with_retry<F, Fut>(
    policy: &RetryPolicy,
    symbol: &str,
    source: &ProviderId,
    on_error: &(dyn Fn(&str, &str) + Send + Sync),
    mut call: F,
) -> RetryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProviderResult, MarketDataError>>,
{
    let total = policy.total_attempts();
    let mut attempt = 0;

    loop {
        let started = Instant::now();
        let result = match AssertUnwindSafe(async { call().await }).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ProviderResult::failure(
                source.clone(),
                e.to_string(),
                started.elapsed().as_millis() as u64,
            ),
            Err(panic) => ProviderResult::failure(
                source.clone(),
                panic_message(panic.as_ref()),
                started.elapsed().as_millis() as u64,
            ),
        };
        attempt += 1;

        if result.is_success() {
            return RetryOutcome {
                result,
                attempts: attempt,
            };
        }

        let error = result.error().unwrap_or("unknown error");
        warn!(
            "Attempt {}/{} for {} via '{}' failed: {}",
            attempt, total, symbol, source, error
        );
        on_error(symbol, error);

        if attempt >= total {
            return RetryOutcome {
                result,
                attempts: attempt,
            };
        }

        let delay = policy.delay_for_attempt(attempt - 1);
        debug!(
            "Retrying {} via '{}' in {}ms",
            symbol,
            source,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "provider panicked".to_string()
    }
}
