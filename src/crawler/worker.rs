//! Worker pool member and the lifecycle of a single job
//!
//! Each worker loops: pop a job, wait for a rate-limiter permit, render the
//! page, re-enqueue admissible links, summarize the text, publish the result.
//! Every suspension point is raced against the crawl's cancellation token.

use crate::crawler::dedup::DedupStore;
use crate::crawler::frontier::Frontier;
use crate::crawler::job::{CrawlResult, ErrorKind, Job, JobError};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::renderer::Renderer;
use crate::crawler::summarizer::Summarizer;
use crate::url::{is_allowed_host, resolve_link};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a worker shares with the rest of the pool for one crawl
pub(crate) struct WorkerContext {
    pub frontier: Arc<Frontier>,
    pub dedup: Arc<DedupStore>,
    pub limiter: Arc<RateLimiter>,
    pub renderer: Arc<dyn Renderer>,
    pub summarizer: Arc<dyn Summarizer>,
    pub max_depth: u32,
    pub allowed_host: Option<String>,
    pub cancel: CancellationToken,
}

/// Marks the popped job complete when dropped, including on panic
struct JobCompletion<'a>(&'a Frontier);

impl Drop for JobCompletion<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Takes the worker out of the frontier's producer count when dropped
struct WorkerExit<'a>(&'a Frontier);

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        self.0.retire_producer();
    }
}

/// Runs one worker until the frontier closes or the crawl is cancelled
///
/// Returns the number of jobs this worker processed.
pub(crate) async fn run_worker(
    id: usize,
    ctx: Arc<WorkerContext>,
    results: mpsc::Sender<CrawlResult>,
) -> usize {
    let _exit = WorkerExit(&ctx.frontier);
    tracing::debug!("Worker {} started", id);

    let mut processed = 0;
    while let Some(job) = ctx.frontier.pop(&ctx.cancel).await {
        let _completion = JobCompletion(&ctx.frontier);
        tracing::debug!("Worker {} picked up {} (depth {})", id, job.location, job.depth);

        let result = process_job(&ctx, &job).await;
        publish(&ctx, &results, result).await;
        processed += 1;
    }

    tracing::debug!("Worker {} exiting after {} jobs", id, processed);
    processed
}

/// Turns one job into its result; never fails, errors live on the result
async fn process_job(ctx: &WorkerContext, job: &Job) -> CrawlResult {
    if ctx.limiter.acquire(&ctx.cancel).await.is_err() {
        return CrawlResult::failed(job, JobError::cancelled("rate limiting"));
    }

    let allowed_host = ctx.allowed_host.as_deref();
    let rendered = tokio::select! {
        biased;
        rendered = ctx.renderer.render(&job.location, allowed_host) => rendered,
        _ = ctx.cancel.cancelled() => {
            return CrawlResult::failed(job, JobError::cancelled("render"));
        }
    };

    let page = match rendered {
        Ok(page) => page,
        Err(error) => {
            let error = enforce_host_on_error(error, allowed_host);
            tracing::debug!("Failed to render {}: {}", job.location, error);
            return CrawlResult::failed(job, error);
        }
    };

    if !is_allowed_host(&page.final_url, allowed_host) {
        tracing::debug!(
            "{} ended up on non-allowed host {}",
            job.location,
            page.final_url
        );
        let error = JobError::disallowed_host(&page.final_url).at(page.final_url);
        return CrawlResult::failed(job, error);
    }

    let mut result = CrawlResult::for_job(job);
    result.final_location = Some(page.final_url.clone());
    result.links = normalize_links(&page.links, &page.final_url);
    result.content = page.text;

    if job.depth < ctx.max_depth {
        enqueue_links(ctx, job, &result.links).await;
    }

    if result.content.trim().is_empty() {
        tracing::debug!("No text extracted from {}, skipping summary", job.location);
        return result;
    }

    let summary = tokio::select! {
        biased;
        summary = ctx.summarizer.summarize(&result.content) => Some(summary),
        _ = ctx.cancel.cancelled() => None,
    };

    match summary {
        Some(Ok(summary)) => result.summary = summary,
        Some(Err(e)) => tracing::warn!("Failed to summarize {}: {}", job.location, e),
        None => result.error = Some(JobError::cancelled("summarize")),
    }

    result
}

/// Reclassifies a render failure that happened on a non-allowed host
fn enforce_host_on_error(error: JobError, allowed_host: Option<&str>) -> JobError {
    match &error.final_location {
        Some(final_url)
            if error.kind != ErrorKind::DisallowedHost
                && !is_allowed_host(final_url, allowed_host) =>
        {
            JobError::disallowed_host(final_url).at(final_url.clone())
        }
        _ => error,
    }
}

/// Resolves raw hrefs against the page's final URL, dropping duplicates
fn normalize_links(raw: &[String], base: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|href| resolve_link(href, base))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Admits and pushes the page's links one hop deeper
async fn enqueue_links(ctx: &WorkerContext, job: &Job, links: &[Url]) {
    let child_depth = job.depth + 1;
    let mut enqueued = 0;

    for link in links {
        if !ctx.dedup.admit(link) {
            continue;
        }

        match ctx
            .frontier
            .push(Job::new(link.clone(), child_depth), &ctx.cancel)
            .await
        {
            Ok(()) => enqueued += 1,
            Err(e) => {
                tracing::debug!("Stopped enqueueing links from {}: {}", job.location, e);
                break;
            }
        }
    }

    tracing::debug!(
        "Enqueued {} of {} links from {} at depth {}",
        enqueued,
        links.len(),
        job.location,
        child_depth
    );
}

/// Hands the result to the stream, giving up if the crawl is cancelled
/// while the stream is full
async fn publish(ctx: &WorkerContext, results: &mpsc::Sender<CrawlResult>, result: CrawlResult) {
    let location = result.location.clone();

    tokio::select! {
        biased;
        sent = results.send(result) => {
            if sent.is_err() {
                tracing::warn!("Result stream closed, dropping result for {}", location);
            }
        }
        _ = ctx.cancel.cancelled() => {
            tracing::warn!("Crawl cancelled while stream was full, dropping result for {}", location);
        }
    }
}
