//! Crawler coordinator - crawl entry point and supervision
//!
//! This module wires one crawl together:
//! - Validating and normalizing the seed
//! - Creating the per-crawl frontier, visited set and rate limiter
//! - Spawning the fixed worker pool
//! - Supervising the workers and closing the result stream once they exit
//! - Exposing cancellation to the caller

use crate::config::{validate_crawler_config, CrawlerConfig};
use crate::crawler::dedup::DedupStore;
use crate::crawler::frontier::Frontier;
use crate::crawler::job::{CrawlResult, Job};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::renderer::Renderer;
use crate::crawler::summarizer::Summarizer;
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::url::normalize_url;
use crate::HarvestError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Crawl engine bound to a renderer and a summarizer
///
/// A `Crawler` holds no per-crawl state; every call to [`Crawler::crawl`] gets
/// its own frontier, visited set and rate limiter, so concurrent crawls never
/// interfere.
pub struct Crawler {
    config: CrawlerConfig,
    renderer: Arc<dyn Renderer>,
    summarizer: Arc<dyn Summarizer>,
}

impl Crawler {
    pub fn new(
        config: CrawlerConfig,
        renderer: Arc<dyn Renderer>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            renderer,
            summarizer,
        }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Starts crawling from `seed` and returns the live result stream
    ///
    /// Returns as soon as the seed is queued and the workers are spawned. The
    /// crawl runs under a child of `parent`, so cancelling `parent` stops it
    /// too. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// * `HarvestError::InvalidSeedUrl` - `seed` is not an absolute http(s) URL
    /// * `HarvestError::Config` - the crawler settings are out of range
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use sumi_harvest::config::{RendererConfig, SummarizerConfig, CrawlerConfig};
    /// use sumi_harvest::crawler::{build_summarizer, Crawler, HttpRenderer};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let renderer = Arc::new(HttpRenderer::new(RendererConfig::default()));
    /// let summarizer = build_summarizer(&SummarizerConfig::default())?;
    /// let crawler = Crawler::new(CrawlerConfig::default(), renderer, summarizer);
    ///
    /// let mut stream = crawler.crawl("https://example.com/", &CancellationToken::new())?;
    /// while let Some(result) = stream.recv().await {
    ///     println!("{} -> {:?}", result.location, result.error);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn crawl(
        &self,
        seed: &str,
        parent: &CancellationToken,
    ) -> Result<ResultStream, HarvestError> {
        let seed_url = normalize_url(seed).map_err(|e| HarvestError::InvalidSeedUrl {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        validate_crawler_config(&self.config)?;

        let workers = self.config.max_workers as usize;
        let cancel = parent.child_token();

        let frontier = Arc::new(Frontier::new(workers));
        let dedup = Arc::new(DedupStore::new());
        dedup.admit(&seed_url);
        frontier.seed(Job::new(seed_url.clone(), 0))?;

        let ctx = Arc::new(WorkerContext {
            frontier,
            dedup,
            limiter: Arc::new(RateLimiter::new(self.config.permit_interval())),
            renderer: Arc::clone(&self.renderer),
            summarizer: Arc::clone(&self.summarizer),
            max_depth: self.config.max_depth,
            allowed_host: self.config.allowed_host.clone(),
            cancel: cancel.clone(),
        });

        let (tx, rx) = mpsc::channel(workers);
        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(run_worker(id, Arc::clone(&ctx), tx.clone()));
        }

        tracing::info!(
            "Crawl started from {} with {} workers, max depth {}, {} req/s",
            seed_url,
            workers,
            self.config.max_depth,
            self.config.rate
        );

        tokio::spawn(supervise(pool, ctx, tx, seed_url));

        Ok(ResultStream {
            results: rx,
            cancel,
        })
    }
}

/// Waits for every worker, then closes the result stream
///
/// The supervisor holds the last sender; dropping it after the pool has
/// drained is what ends the consumer's `recv` loop.
async fn supervise(
    mut pool: JoinSet<usize>,
    ctx: Arc<WorkerContext>,
    results: mpsc::Sender<CrawlResult>,
    seed: Url,
) {
    let started = Instant::now();
    let mut processed = 0;

    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(count) => processed += count,
            Err(e) if e.is_panic() => tracing::error!("Worker panicked: {}", e),
            Err(e) => tracing::error!("Worker task failed: {}", e),
        }
    }

    if ctx.cancel.is_cancelled() {
        tracing::info!(
            "Crawl from {} cancelled after {} jobs in {:?}",
            seed,
            processed,
            started.elapsed()
        );
    } else {
        tracing::info!(
            "Crawl from {} complete: {} jobs, {} locations admitted, in {:?}",
            seed,
            processed,
            ctx.dedup.len(),
            started.elapsed()
        );
    }

    drop(results);
}

/// Read side of a running crawl
///
/// Yields one [`CrawlResult`] per processed job, in completion order, and
/// returns `None` once every worker has exited. Dropping the stream cancels
/// the crawl.
#[derive(Debug)]
pub struct ResultStream {
    results: mpsc::Receiver<CrawlResult>,
    cancel: CancellationToken,
}

impl ResultStream {
    /// Waits for the next result; `None` means the crawl is finished
    pub async fn recv(&mut self) -> Option<CrawlResult> {
        self.results.recv().await
    }

    /// Cancels this crawl; calling it again has no further effect
    ///
    /// Results already published stay readable.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Cancelling crawl");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle that cancels this crawl, for signal handlers and timers
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drains the stream until the crawl finishes
    pub async fn collect(mut self) -> Vec<CrawlResult> {
        let mut collected = Vec::new();
        while let Some(result) = self.recv().await {
            collected.push(result);
        }
        collected
    }
}

impl Drop for ResultStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
