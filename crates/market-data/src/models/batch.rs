use std::collections::HashMap;

use serde::Serialize;

use super::bar::Bar;

/// Aggregate counters for one batch invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatistics {
    /// Distinct symbols after deduplication
    pub total_symbols: usize,
    /// Symbols for which some provider reported success
    pub success_count: usize,
    /// Symbols that exhausted every provider or timed out
    pub failed_count: usize,
    /// Sum of bar counts across `BatchResult::data`
    pub total_klines: usize,
    /// Wall-clock milliseconds for the whole batch
    pub total_time: u64,
}

/// Output of a multi-symbol fetch. Owned entirely by the caller.
///
/// Maps are keyed by symbol; iteration order does not follow input order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchResult {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub statistics: BatchStatistics,
}

impl BatchResult {
    /// Result for a request with no symbols.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Recompute `total_klines` from the current `data` map.
    pub fn recount_klines(&mut self) {
        self.statistics.total_klines = self.data.values().map(Vec::len).sum();
    }

    /// Bars for a symbol, if it produced usable data.
    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.data.get(symbol).map(Vec::as_slice)
    }

    /// Whether at least one symbol produced data.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}
