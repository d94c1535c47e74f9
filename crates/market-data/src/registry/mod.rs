//! Per-symbol fetch orchestration.
//!
//! This module provides:
//! - The retry controller (bounded retries with exponential backoff)
//! - The failover chain over an ordered provider list
//! - Fetch diagnostics recording what each provider did
//! - Bar validation and series normalization

mod diagnostics;
mod failover;
mod retry;
mod validator;

pub use diagnostics::{AttemptOutcome, FetchDiagnostics, ProviderAttempt, SkipReason};
pub use failover::{FailoverChain, FailoverOutcome, ALL_SOURCES};
pub use retry::{
    call_with_retry, RetryOutcome, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY,
    DEFAULT_MAX_RETRIES,
};
pub use validator::{normalize_bars, BarValidator, ValidatorConfig};
