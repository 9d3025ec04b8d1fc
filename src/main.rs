use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fillbook::config::{default_config_path, ResolvedConfig};
use fillbook::fetch::DexterityFillSource;
use fillbook::products::{ProductRange, DEFAULT_YEAR};
use fillbook::report::VolumeReport;
use fillbook::store::FillStore;
use fillbook::sync::FillSync;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fillbook", version)]
#[command(about = "Fetch Dexterity fills and report notional volume")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip fetching data from the API; report on existing local data
    #[arg(long)]
    skip_fetch: bool,

    /// Last two digits of the year to fetch
    #[arg(long, default_value_t = DEFAULT_YEAR, value_parser = clap::value_parser!(u32).range(0..=99))]
    year: u32,

    /// Month to fetch. If unspecified, fetches the whole year
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Day to fetch. If unspecified, fetches the whole month
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
    day: Option<u32>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Stop each product after this many pages (overrides config)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)?;
    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database_path.clone());

    let mut store = FillStore::open(&database)?;

    if !cli.skip_fetch {
        let mut client = reqwest::Client::builder();
        if let Some(timeout) = config.fetch.request_timeout {
            client = client.timeout(timeout);
        }
        let client = client.build().context("Failed to build HTTP client")?;

        let source = DexterityFillSource::with_client(client)
            .with_base_url(config.api_base_url.clone())
            .with_max_retries(config.fetch.max_retries)
            .with_retry_backoff(config.fetch.retry_backoff);

        let products = ProductRange::new(config.underlyings.clone(), cli.year)
            .with_month(cli.month)
            .with_day(cli.day)
            .symbols();

        let sync = FillSync::new(Arc::new(source))
            .with_max_pages(cli.max_pages.or(config.fetch.max_pages))
            .with_progress(!cli.json);
        let result = sync.sync_products(&mut store, &products).await?;

        if !result.truncated.is_empty() {
            warn!(
                products = ?result.truncated,
                "Some products hit the page limit; their oldest fills were not fetched"
            );
        }
    }

    store.deduplicate()?;

    let report = VolumeReport::from_store(&store, config.report.best_days)?;
    let mut out = std::io::stdout().lock();
    if cli.json {
        report.render_json(&mut out)?;
    } else {
        report.render_text(&config.display, &mut out)?;
    }

    Ok(())
}
