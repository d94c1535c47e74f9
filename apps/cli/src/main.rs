mod config;
mod main_lib;

use clap::Parser;

use config::FetchConfig;
use main_lib::{init_tracing, render, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = FetchConfig::from_env();
    init_tracing();

    let result = run(&cli, &config).await?;
    println!("{}", render(&result, cli.pretty)?);

    if !result.has_data() && !result.errors.is_empty() {
        anyhow::bail!(
            "No symbol produced data ({} failed)",
            result.statistics.failed_count
        );
    }
    Ok(())
}
