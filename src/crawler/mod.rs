//! Crawler module for the crawl engine and its collaborators
//!
//! This module contains the core crawling logic, including:
//! - The visited set, frontier and global rate limiter
//! - The worker pool and per-job lifecycle
//! - The crawl entry point and result stream
//! - The page renderer and summarizer collaborators

mod coordinator;
mod dedup;
mod fetcher;
mod frontier;
mod job;
mod parser;
mod rate_limiter;
mod renderer;
mod summarizer;
mod worker;

pub use coordinator::{Crawler, ResultStream};
pub use dedup::DedupStore;
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use frontier::{Frontier, FrontierError};
pub use job::{CrawlResult, ErrorKind, Job, JobError};
pub use parser::{parse_html, ParsedPage};
pub use rate_limiter::{AcquireCancelled, RateLimiter};
pub use renderer::{HttpRenderer, RenderedPage, Renderer};
pub use summarizer::{
    build_summarizer, truncate_for_summary, OllamaSummarizer, SummarizeError, Summarizer,
    TRUNCATION_MARKER,
};
