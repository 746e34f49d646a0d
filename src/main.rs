//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest content harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config, validate, Config};
use sumi_harvest::crawler::{Coordinator, CrawlReport};
use sumi_harvest::output::{close_shared, open_sink, share, SharedSink};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a bounded-depth web content harvester
///
/// Sumi-Harvest fetches pages from a seed URL within an allow-list of
/// domains and records every matched text fragment to a CSV file and a
/// JSON Lines file.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-depth web content harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed URL to start from
    #[arg(long)]
    seed: Option<String>,

    /// Allowed domain pattern; repeat for several (replaces the configured list)
    #[arg(long = "allowed-domain", value_name = "DOMAIN")]
    allowed_domains: Vec<String>,

    /// Number of link levels to fetch, seed included (0 = unlimited)
    #[arg(long)]
    max_depth: Option<u32>,

    /// CSV output path
    #[arg(long, value_name = "PATH")]
    csv: Option<String>,

    /// JSON Lines output path
    #[arg(long, value_name = "PATH")]
    jsonl: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(seed) = &self.seed {
            config.crawler.seed_url = seed.clone();
        }
        if !self.allowed_domains.is_empty() {
            config.crawler.allowed_domains = self.allowed_domains.clone();
        }
        if let Some(max_depth) = self.max_depth {
            config.crawler.max_depth = max_depth;
        }
        if let Some(csv) = &self.csv {
            config.output.csv_path = csv.clone();
        }
        if let Some(jsonl) = &self.jsonl {
            config.output.jsonl_path = jsonl.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration")?;

    tracing::info!(
        "Seed: {}, allowed domains: {:?}, max depth: {}",
        config.crawler.seed_url,
        config.crawler.allowed_domains,
        config.crawler.max_depth
    );

    // Failing to create either output is fatal before any crawling starts
    let sink = share(open_sink(&config.output).context("failed to create output files")?);

    let report = crawl_and_close(&config, sink).await?;
    tracing::info!(
        "Wrote {} fragments to {} and {} in {}ms",
        report.fragments_logged,
        config.output.csv_path,
        config.output.jsonl_path,
        report.duration_ms().unwrap_or(0)
    );

    Ok(())
}

/// Crawls from the configured seed and closes the sink on every exit path
async fn crawl_and_close(config: &Config, sink: SharedSink) -> anyhow::Result<CrawlReport> {
    let crawl_result = crawl(config, sink.clone()).await;

    if let Err(e) = close_shared(&sink) {
        tracing::error!("Failed to close outputs: {}", e);
    }

    Ok(crawl_result?)
}

async fn crawl(config: &Config, sink: SharedSink) -> sumi_harvest::Result<CrawlReport> {
    let mut coordinator = Coordinator::with_http(config, sink)?;

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            stop.stop();
        }
    });

    coordinator.visit(&config.crawler.seed_url).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
