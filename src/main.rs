//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest crawl engine.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_harvest::config::{default_config, load_config_with_hash, Config};
use sumi_harvest::crawler::{build_summarizer, CrawlResult, Crawler, HttpRenderer, Renderer};
use sumi_harvest::output::{print_statistics, write_markdown_report, CrawlReport, CrawlStatistics};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a bounded-concurrency crawler with page summaries
///
/// Sumi-Harvest walks outward from a seed URL with a fixed pool of workers
/// under a global rate limit, extracting each page's text and summarizing it
/// with a local language model.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency crawler with page summaries", long_about = None)]
struct Cli {
    /// The seed URL to start crawling from
    #[arg(short, long)]
    url: String,

    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write a markdown report of the crawl to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Print the extracted text length of every page
    #[arg(long)]
    show_content: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => (default_config().context("invalid default configuration")?, None),
    };
    if let Some(hash) = &config_hash {
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
    }

    handle_crawl(&cli, config, config_hash.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
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

/// Runs one crawl, printing results as they arrive
async fn handle_crawl(cli: &Cli, config: Config, config_hash: Option<&str>) -> Result<()> {
    tracing::info!(
        "Crawler config: max depth {}, rate {} req/s, {} workers",
        config.crawler.max_depth,
        config.crawler.rate,
        config.crawler.max_workers
    );

    let renderer = Arc::new(HttpRenderer::new(config.renderer.clone()));
    renderer.start().await.context("failed to start renderer")?;

    let summarizer =
        build_summarizer(&config.summarizer).context("failed to build summarizer")?;
    tracing::info!(
        "Summarizing with {} at {}",
        config.summarizer.model,
        config.summarizer.url
    );

    let crawler = Crawler::new(config.crawler.clone(), renderer.clone(), summarizer);
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let mut stream = match crawler.crawl(&cli.url, &shutdown) {
        Ok(stream) => stream,
        Err(e) => {
            renderer.shutdown().await;
            return Err(e).context("failed to start crawl");
        }
    };

    let mut stats = CrawlStatistics::new();
    let mut results = Vec::new();
    while let Some(result) = stream.recv().await {
        stats.record(&result);
        print_result(&result, cli.show_content);
        if cli.report.is_some() {
            results.push(result);
        }
    }
    stats.finish();
    renderer.shutdown().await;

    if !cli.quiet {
        println!();
        print_statistics(&stats);
    }

    if let Some(path) = &cli.report {
        let report = CrawlReport {
            seed: &cli.url,
            config_hash,
            stats: &stats,
            results: &results,
        };
        write_markdown_report(&report, path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("✓ Report written to: {}", path.display());
    }

    Ok(())
}

/// Cancels the crawl on the first Ctrl-C
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Received shutdown signal, cancelling crawl...");
                shutdown.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
    });
}

fn print_result(result: &CrawlResult, show_content: bool) {
    if let Some(error) = &result.error {
        println!("✗ {} (depth {}): {}", result.location, result.depth, error);
        return;
    }

    println!(
        "✓ {} (depth {}, {} links)",
        result.location,
        result.depth,
        result.links.len()
    );
    if show_content {
        println!("  Content length: {} characters", result.content.chars().count());
    }
    if !result.summary.is_empty() {
        println!("  Summary:");
        for line in result.summary.lines() {
            println!("    {}", line);
        }
    }
}
