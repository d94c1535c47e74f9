use std::sync::{Arc, Mutex};
use std::time::Duration;

use qtrd_market_data::registry::RetryPolicy;
use qtrd_market_data::{
    AdjustMode, Bar, BatchFetcher, BatchOptions, BatchStatistics, MarketDataError, Timeframe,
};

mod common;
use common::{as_providers, daily_bars, date, Behavior, MockProvider, DAY};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    }
}

fn options() -> BatchOptions {
    BatchOptions::default().with_retry(fast_retry())
}

#[tokio::test(start_paused = true)]
async fn test_duplicates_are_fetched_once() {
    let primary = MockProvider::succeeding("PRIMARY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone()]));

    let symbols = ["600519", "000001", "600519", "300750", "000001", "600519"];
    let result = fetcher
        .batch_fetch(&symbols, Timeframe::Day1, 10, &options())
        .await
        .unwrap();

    assert_eq!(result.statistics.total_symbols, 3);
    assert_eq!(result.statistics.success_count, 3);
    assert_eq!(primary.call_count(), 3);
    for symbol in ["600519", "000001", "300750"] {
        assert_eq!(primary.calls_for(symbol), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_healthy_primary_never_touches_secondary() {
    let primary = MockProvider::succeeding("PRIMARY").shared();
    let secondary = MockProvider::succeeding("SECONDARY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone(), secondary.clone()]));

    let result = fetcher
        .batch_fetch(&["600519", "000001", "300750"], Timeframe::Day1, 10, &options())
        .await
        .unwrap();

    assert_eq!(result.data.len(), 3);
    assert_eq!(secondary.call_count(), 0);
}

async fn assert_failover_after_full_retry_cycle(primary_behavior: Behavior) {
    let primary = MockProvider::new("PRIMARY", primary_behavior).shared();
    let secondary = MockProvider::succeeding("SECONDARY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone(), secondary.clone()]));
    let symbols = ["600519", "000001"];

    let result = fetcher
        .batch_fetch(&symbols, Timeframe::Day1, 10, &options())
        .await
        .unwrap();

    assert!(result.errors.is_empty());
    for symbol in symbols {
        assert_eq!(result.bars(symbol).map(<[Bar]>::len), Some(10));
        assert_eq!(primary.calls_for(symbol), 3);
        assert_eq!(secondary.calls_for(symbol), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_reported_failures_fail_over() {
    assert_failover_after_full_retry_cycle(Behavior::Report("HTTP error: 502".into())).await;
}

#[tokio::test(start_paused = true)]
async fn test_raised_errors_fail_over() {
    assert_failover_after_full_retry_cycle(Behavior::Raise).await;
}

#[tokio::test(start_paused = true)]
async fn test_panics_fail_over() {
    assert_failover_after_full_retry_cycle(Behavior::Panic).await;
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_uses_sentinel_message() {
    let fetcher = BatchFetcher::new(as_providers(&[
        MockProvider::failing("PRIMARY").shared(),
        MockProvider::new("SECONDARY", Behavior::Raise).shared(),
    ]));

    let result = fetcher
        .batch_fetch(&["600519", "000001", "300750"], Timeframe::Day1, 10, &options())
        .await
        .unwrap();

    assert!(result.data.is_empty());
    assert_eq!(result.errors.len(), 3);
    for error in result.errors.values() {
        assert!(error.contains("All data sources failed"), "got {}", error);
    }
    assert_eq!(result.statistics.failed_count, 3);
    assert_eq!(result.statistics.success_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_are_counted() {
    let broken = Behavior::Report("symbol delisted".into());
    let primary = MockProvider::succeeding("PRIMARY")
        .with_symbol("600001", broken.clone())
        .with_symbol("600002", broken.clone())
        .shared();
    let secondary = MockProvider::succeeding("SECONDARY")
        .with_symbol("600001", broken.clone())
        .with_symbol("600002", broken)
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary, secondary]));

    let symbols = ["600519", "600001", "000001", "600002", "300750"];
    let result = fetcher
        .batch_fetch(&symbols, Timeframe::Day1, 10, &options())
        .await
        .unwrap();

    assert_eq!(result.statistics.total_symbols, 5);
    assert_eq!(result.statistics.success_count, 3);
    assert_eq!(result.statistics.failed_count, 2);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.contains_key("600001"));
    assert!(result.errors.contains_key("600002"));
    assert_eq!(result.statistics.total_klines, 30);
}

#[tokio::test(start_paused = true)]
async fn test_empty_symbol_list_returns_zero_statistics() {
    let primary = MockProvider::succeeding("PRIMARY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone()]));
    let none: [&str; 0] = [];

    let result = fetcher
        .batch_fetch(&none, Timeframe::Day1, 10, &options())
        .await
        .unwrap();
    assert!(result.data.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.statistics, BatchStatistics::default());

    let ranged = fetcher
        .batch_fetch_with_date_range(
            &none,
            Timeframe::Day1,
            date("2024-01-03"),
            date("2024-01-07"),
            &options(),
        )
        .await
        .unwrap();
    assert_eq!(ranged.statistics.total_symbols, 0);
    assert_eq!(primary.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_series_respects_skip_empty() {
    let primary = MockProvider::succeeding("PRIMARY")
        .with_symbol("688981", Behavior::Bars(vec![]))
        .shared();
    let secondary = MockProvider::succeeding("SECONDARY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary, secondary.clone()]));
    let symbols = ["600519", "688981"];

    let skipped = fetcher
        .batch_fetch(&symbols, Timeframe::Day1, 10, &options())
        .await
        .unwrap();
    assert!(!skipped.data.contains_key("688981"));
    assert!(!skipped.errors.contains_key("688981"));
    assert_eq!(skipped.statistics.success_count, 2);
    assert_eq!(skipped.statistics.failed_count, 0);
    // An empty success is not a failure, so no failover happened.
    assert_eq!(secondary.call_count(), 0);

    let kept = fetcher
        .batch_fetch(
            &symbols,
            Timeframe::Day1,
            10,
            &options().with_skip_empty(false),
        )
        .await
        .unwrap();
    assert_eq!(kept.bars("688981"), Some(&[][..]));
    assert_eq!(kept.statistics.total_klines, 10);
}

#[tokio::test(start_paused = true)]
async fn test_slow_symbol_times_out_without_blocking_others() {
    let primary = MockProvider::succeeding("PRIMARY")
        .with_symbol("600519", Behavior::Hang)
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary]));

    let order = Arc::new(Mutex::new(Vec::new()));
    let recorded = order.clone();
    let options = options()
        .with_concurrency(2)
        .with_timeout(Duration::from_secs(5))
        .on_progress(move |_, _, symbol| recorded.lock().unwrap().push(symbol.to_string()));

    let result = fetcher
        .batch_fetch(&["600519", "000001", "300750"], Timeframe::Day1, 10, &options)
        .await
        .unwrap();

    let error = result.errors.get("600519").expect("timeout recorded");
    assert!(error.contains("Timeout"), "got {}", error);
    assert!(error.contains("5000ms"));
    assert_eq!(result.data.len(), 2);
    assert_eq!(order.lock().unwrap().last().map(String::as_str), Some("600519"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_budget_starts_when_symbol_starts() {
    let primary = MockProvider::succeeding("PRIMARY")
        .with_delay(Duration::from_secs(3))
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary]));
    let options = options()
        .with_concurrency(1)
        .with_timeout(Duration::from_secs(5));

    // Queued symbols wait up to 6s for a slot but each runs for only 3s.
    let result = fetcher
        .batch_fetch(&["600519", "000001", "300750"], Timeframe::Day1, 10, &options)
        .await
        .unwrap();

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.statistics.success_count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap_is_respected() {
    let primary = MockProvider::succeeding("PRIMARY")
        .with_delay(Duration::from_millis(100))
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone()]));
    let symbols: Vec<String> = (0..20).map(|i| format!("6000{:02}", i)).collect();

    let result = fetcher
        .batch_fetch(&symbols, Timeframe::Day1, 10, &options().with_concurrency(4))
        .await
        .unwrap();

    assert_eq!(result.statistics.success_count, 20);
    assert_eq!(primary.max_in_flight(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_zero_concurrency_still_completes() {
    let primary = MockProvider::succeeding("PRIMARY")
        .with_delay(Duration::from_millis(10))
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone()]));

    let result = fetcher
        .batch_fetch(&["600519", "000001"], Timeframe::Day1, 10, &options().with_concurrency(0))
        .await
        .unwrap();

    assert_eq!(result.statistics.success_count, 2);
    assert_eq!(primary.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_progress_follows_completion_order() {
    let slow = MockProvider::succeeding("SLOW")
        .with_delay(Duration::from_secs(2))
        .shared();
    // Route "600519" through a slow provider by failing it on the fast one.
    let fast = MockProvider::succeeding("FAST")
        .with_symbol("600519", Behavior::Report("not here".into()))
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[fast, slow.clone()]));

    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();
    let options = BatchOptions::default()
        .with_retry(RetryPolicy::no_retry())
        .on_progress(move |completed, total, symbol| {
            recorded
                .lock()
                .unwrap()
                .push((completed, total, symbol.to_string()));
        });

    fetcher
        .batch_fetch(&["600519", "000001", "300750"], Timeframe::Day1, 10, &options)
        .await
        .unwrap();

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.0).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(events.iter().all(|e| e.1 == 3));
    assert_eq!(events[2].2, "600519");
    assert_eq!(slow.calls(), vec!["600519"]);
}

#[tokio::test(start_paused = true)]
async fn test_on_error_sees_every_failed_attempt() {
    let fetcher = BatchFetcher::new(as_providers(&[
        MockProvider::failing("PRIMARY").shared(),
        MockProvider::succeeding("SECONDARY").shared(),
    ]));

    let errors = Arc::new(Mutex::new(Vec::new()));
    let recorded = errors.clone();
    let options = options().on_error(move |symbol, error| {
        recorded
            .lock()
            .unwrap()
            .push(format!("{}: {}", symbol, error));
    });

    let result = fetcher
        .batch_fetch(&["600519", "000001"], Timeframe::Day1, 10, &options)
        .await
        .unwrap();

    assert_eq!(result.statistics.success_count, 2);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 6);
    assert!(errors
        .iter()
        .all(|e| e.ends_with("PRIMARY upstream unavailable")));
}

#[tokio::test(start_paused = true)]
async fn test_intraday_skips_daily_only_providers() {
    let daily = MockProvider::succeeding("DAILY").daily_only().shared();
    let intraday = MockProvider::succeeding("INTRADAY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[daily.clone(), intraday.clone()]));

    let result = fetcher
        .batch_fetch(&["600519"], Timeframe::Minute5, 48, &options())
        .await
        .unwrap();

    assert_eq!(result.statistics.success_count, 1);
    assert_eq!(daily.call_count(), 0);
    assert_eq!(intraday.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_date_range_keeps_window_only() {
    let primary = MockProvider::succeeding("PRIMARY")
        .with_symbol("000001", Behavior::Bars(daily_bars("2023-03-01", 10)))
        .shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary]));

    let result = fetcher
        .batch_fetch_with_date_range(
            &["600519", "000001"],
            Timeframe::Day1,
            date("2024-01-03"),
            date("2024-01-07"),
            &options(),
        )
        .await
        .unwrap();

    let bars = result.bars("600519").expect("in-range symbol kept");
    assert_eq!(bars.len(), 6);
    assert_eq!(bars[0].time, daily_bars("2024-01-03", 1)[0].time);
    // Nothing in range: dropped without being an error.
    assert!(!result.data.contains_key("000001"));
    assert!(!result.errors.contains_key("000001"));
    assert_eq!(result.statistics.total_klines, 6);
}

#[tokio::test(start_paused = true)]
async fn test_inverted_date_range_is_rejected() {
    let primary = MockProvider::succeeding("PRIMARY").shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary.clone()]));

    let err = fetcher
        .batch_fetch_with_date_range(
            &["600519"],
            Timeframe::Day1,
            date("2024-01-07"),
            date("2024-01-03"),
            &options(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MarketDataError::InvalidDateRange { .. }));
    assert_eq!(primary.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blank_symbol_is_rejected() {
    let fetcher = BatchFetcher::new(as_providers(&[MockProvider::succeeding("PRIMARY").shared()]));
    let err = fetcher
        .batch_fetch(&["600519", ""], Timeframe::Day1, 10, &options())
        .await
        .unwrap_err();
    assert!(err.is_malformed_input());
}

#[tokio::test(start_paused = true)]
async fn test_series_are_normalized_before_reporting() {
    let mut bars = daily_bars("2024-01-01", 4);
    bars.reverse();
    bars.push(Bar::new(bars[0].time, 11.0, 11.2, 10.8, 11.0, 1.0));
    bars.push(Bar::new(bars[1].time + 1, 10.0, 9.0, 11.0, 10.0, 1.0));

    let primary = MockProvider::new("PRIMARY", Behavior::Bars(bars)).shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary]));

    let result = fetcher
        .batch_fetch(&["600519"], Timeframe::Day1, 10, &options())
        .await
        .unwrap();

    let series = result.bars("600519").unwrap();
    assert_eq!(series.len(), 4);
    assert!(series.windows(2).all(|w| w[0].time < w[1].time));
    assert_eq!(series[3].close, 11.0);
}

#[tokio::test(start_paused = true)]
async fn test_forward_adjustment_is_applied() {
    let mut bars = daily_bars("2024-01-01", 5);
    for bar in bars.iter_mut().skip(2) {
        *bar = Bar::new(bar.time, 8.8, 8.9, 8.7, 8.8, bar.volume);
    }
    let primary = MockProvider::new("PRIMARY", Behavior::Bars(bars.clone())).shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary]));

    let result = fetcher
        .batch_fetch(
            &["600519"],
            Timeframe::Day1,
            10,
            &options().with_adjust(AdjustMode::Forward),
        )
        .await
        .unwrap();

    let adjusted = result.bars("600519").unwrap();
    assert!(adjusted[0].close < bars[0].close);
    assert!(adjusted[1].close < bars[1].close);
    assert_eq!(&adjusted[2..], &bars[2..]);
    assert_eq!(adjusted[0].volume, bars[0].volume);
    assert_eq!(adjusted[4].time - adjusted[0].time, 4 * DAY);
}

#[tokio::test(start_paused = true)]
async fn test_zero_priced_bar_survives_backward_adjustment() {
    let mut bars = daily_bars("2024-01-01", 3);
    bars[1] = Bar::new(bars[1].time, 0.0, 0.0, 0.0, 0.0, 0.0);
    let primary = MockProvider::new("PRIMARY", Behavior::Bars(bars.clone())).shared();
    let fetcher = BatchFetcher::new(as_providers(&[primary]));

    let result = fetcher
        .batch_fetch(
            &["600519"],
            Timeframe::Day1,
            10,
            &options().with_adjust(AdjustMode::Backward),
        )
        .await
        .unwrap();

    let adjusted = result.bars("600519").unwrap();
    assert_eq!(adjusted, &bars[..]);
    assert!(adjusted.iter().all(|bar| bar.low <= bar.close && bar.close <= bar.high));
}
