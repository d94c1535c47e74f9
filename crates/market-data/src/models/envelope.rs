use chrono::{DateTime, Utc};
use serde::Serialize;

use super::bar::Bar;
use super::types::ProviderId;

/// Uniform envelope returned by every provider adapter.
///
/// `data` is present exactly when `success` is true, and `error` exactly when
/// it is false. The constructors are the only way to build one, which keeps
/// that pairing intact.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    success: bool,
    data: Option<Vec<Bar>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    source: ProviderId,
    cached: bool,
    timestamp: DateTime<Utc>,
    /// Observed round-trip in milliseconds
    latency: u64,
}

impl ProviderResult {
    /// A successful fetch. `bars` may be empty.
    pub fn success(source: ProviderId, bars: Vec<Bar>, latency: u64) -> Self {
        Self {
            success: true,
            data: Some(bars),
            error: None,
            source,
            cached: false,
            timestamp: Utc::now(),
            latency,
        }
    }

    /// A reported failure.
    pub fn failure(source: ProviderId, error: impl Into<String>, latency: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            source,
            cached: false,
            timestamp: Utc::now(),
            latency,
        }
    }

    /// Mark the payload as served from an adapter-side cache.
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&[Bar]> {
        self.data.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn source(&self) -> &ProviderId {
        &self.source
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn latency(&self) -> u64 {
        self.latency
    }

    /// Consume the envelope, yielding the bars on success or the error on
    /// failure.
    pub fn into_outcome(self) -> Result<Vec<Bar>, String> {
        if self.success {
            Ok(self.data.unwrap_or_default())
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "provider returned no data".to_string()))
        }
    }
}
