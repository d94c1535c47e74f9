//! Per-symbol record of which providers were tried and how they fared.

use crate::models::{ProviderId, Timeframe};

/// Why a provider was passed over without being called.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// Provider does not serve bars of the requested period.
    TimeframeNotSupported(Timeframe),
}

/// Outcome of one provider in the chain.
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    Skipped(SkipReason),
    /// Retry budget spent; carries the last failure message.
    Exhausted(String),
    Succeeded,
}

/// Record of a single provider during a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    /// Calls made against this provider, retries included.
    pub attempts: u32,
    pub outcome: AttemptOutcome,
}

/// Detailed trace of a failover run.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub providers: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.providers.push(ProviderAttempt {
            provider_id,
            attempts: 0,
            outcome: AttemptOutcome::Skipped(reason),
        });
    }

    pub fn record_exhausted(&mut self, provider_id: ProviderId, attempts: u32, error: String) {
        self.providers.push(ProviderAttempt {
            provider_id,
            attempts,
            outcome: AttemptOutcome::Exhausted(error),
        });
    }

    pub fn record_success(&mut self, provider_id: ProviderId, attempts: u32) {
        self.providers.push(ProviderAttempt {
            provider_id,
            attempts,
            outcome: AttemptOutcome::Succeeded,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        if self.providers.is_empty() {
            return "no providers configured".to_string();
        }

        self.providers
            .iter()
            .map(|p| match &p.outcome {
                AttemptOutcome::Succeeded => {
                    format!("{}: SUCCESS after {} attempt(s)", p.provider_id, p.attempts)
                }
                AttemptOutcome::Skipped(SkipReason::TimeframeNotSupported(tf)) => {
                    format!("{}: SKIPPED (no {} bars)", p.provider_id, tf)
                }
                AttemptOutcome::Exhausted(err) => {
                    format!("{}: FAILED x{} ({})", p.provider_id, p.attempts, err)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn has_success(&self) -> bool {
        self.providers
            .iter()
            .any(|p| p.outcome == AttemptOutcome::Succeeded)
    }

    /// The provider that produced the data, if any.
    pub fn winner(&self) -> Option<&ProviderId> {
        self.providers
            .iter()
            .find(|p| p.outcome == AttemptOutcome::Succeeded)
            .map(|p| &p.provider_id)
    }

    /// Total provider calls across the chain.
    pub fn total_attempts(&self) -> u32 {
        self.providers.iter().map(|p| p.attempts).sum()
    }

    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.providers
            .iter()
            .filter_map(|p| match &p.outcome {
                AttemptOutcome::Skipped(reason) => Some((&p.provider_id, reason)),
                _ => None,
            })
            .collect()
    }
}
