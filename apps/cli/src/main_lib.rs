use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use qtrd_market_data::{providers_from_ids, AdjustMode, BatchFetcher, BatchResult, Timeframe};

use crate::config::FetchConfig;

/// Batch-fetch A-share K-lines and print them as JSON.
#[derive(Parser, Debug)]
#[command(name = "qtrd-fetch", version, long_about = None)]
pub struct Cli {
    /// Symbols to fetch, e.g. 600519 000001.SZ sh510300
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Bar period: 1m, 5m, 15m, 30m, 60m, 1d, 1w, 1M
    #[arg(short, long, default_value = "1d")]
    pub timeframe: Timeframe,

    /// Most recent bars per symbol
    #[arg(short, long, default_value_t = 250, conflicts_with = "start")]
    pub limit: usize,

    /// First calendar day to keep (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// Last calendar day to keep (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Price adjustment: none, forward (qfq), backward (hfq)
    #[arg(short, long, default_value = "none")]
    pub adjust: AdjustMode,

    /// Ordered provider ids, overriding QTRD_SOURCES
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Symbols in flight at once, overriding QTRD_CONCURRENCY
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub fn init_tracing() {
    let log_format = std::env::var("QTRD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout carries only the JSON result.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub async fn run(cli: &Cli, config: &FetchConfig) -> anyhow::Result<BatchResult> {
    let sources = if cli.sources.is_empty() {
        &config.sources
    } else {
        &cli.sources
    };
    let providers = providers_from_ids(sources).context("Invalid provider list")?;
    let fetcher = BatchFetcher::new(providers);

    let mut options = config
        .batch_options()
        .with_adjust(cli.adjust)
        .on_progress(|completed, total, symbol| {
            tracing::info!("[{}/{}] {} settled", completed, total, symbol);
        });
    if let Some(concurrency) = cli.concurrency {
        options = options.with_concurrency(concurrency);
    }

    let result = match (cli.start, cli.end) {
        (Some(start), Some(end)) => fetcher
            .batch_fetch_with_date_range(&cli.symbols, cli.timeframe, start, end, &options)
            .await
            .context("Batch fetch rejected")?,
        _ => fetcher
            .batch_fetch(&cli.symbols, cli.timeframe, cli.limit, &options)
            .await
            .context("Batch fetch rejected")?,
    };

    Ok(result)
}

pub fn render(result: &BatchResult, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    };
    json.context("Failed to serialize batch result")
}
