use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::adjust::AdjustMode;
use crate::registry::RetryPolicy;

/// Default number of symbols in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default wall-clock budget for one symbol across all providers and retries.
pub const DEFAULT_SYMBOL_TIMEOUT: Duration = Duration::from_secs(30);

/// `on_progress(completed, total, symbol)`, called once per settled symbol in
/// completion order.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// `on_error(symbol, error)`, called once per failed provider attempt.
pub type ErrorCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Options for one batch invocation.
#[derive(Clone)]
pub struct BatchOptions {
    /// Maximum symbols in flight. `0` is treated as `1`.
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Per-symbol budget, starting when the symbol's task starts.
    pub timeout: Duration,
    /// Omit successful-but-empty series from `BatchResult::data`.
    pub skip_empty: bool,
    /// Adjustment applied to each series after filtering.
    pub adjust: AdjustMode,
    pub on_progress: Option<ProgressCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_SYMBOL_TIMEOUT,
            skip_empty: true,
            adjust: AdjustMode::None,
            on_progress: None,
            on_error: None,
        }
    }
}

impl BatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    pub fn with_adjust(mut self, adjust: AdjustMode) -> Self {
        self.adjust = adjust;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Concurrency actually used by the scheduler.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("skip_empty", &self.skip_empty)
            .field("adjust", &self.adjust)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
