//! Jobs, results and the per-job error taxonomy

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use url::Url;

/// A location waiting in the frontier, with its hop count from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub location: Url,
    pub depth: u32,
}

impl Job {
    pub fn new(location: Url, depth: u32) -> Self {
        Self { location, depth }
    }
}

/// Why a job did not produce usable content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Connection, timeout or non-success HTTP status
    Network,
    /// The response was not an HTML document
    NonHtmlContent,
    /// The final host did not match the allowed-host filter
    DisallowedHost,
    /// The page could not be read or extracted
    Render,
    /// The redirect chain exceeded the configured limit
    TooManyRedirects,
    /// The summarizer gave up; never attached to a job result
    Summarization,
    /// The crawl was cancelled while the job was in flight
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::NonHtmlContent => "non-html-content",
            Self::DisallowedHost => "disallowed-host",
            Self::Render => "render",
            Self::TooManyRedirects => "too-many-redirects",
            Self::Summarization => "summarization",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-job failure, attached to that job's [`CrawlResult`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,

    /// Where the request had ended up when it failed, if it got a response
    pub final_location: Option<Url>,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            final_location: None,
        }
    }

    /// Records the post-redirect location the failure happened at
    pub fn at(mut self, final_location: Url) -> Self {
        self.final_location = Some(final_location);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn non_html(content_type: &str) -> Self {
        Self::new(
            ErrorKind::NonHtmlContent,
            format!("non-HTML content type: {}", content_type),
        )
    }

    pub fn disallowed_host(url: &Url) -> Self {
        Self::new(
            ErrorKind::DisallowedHost,
            format!("non-allowed host: {}", url),
        )
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, message)
    }

    pub fn too_many_redirects(url: &Url) -> Self {
        Self::new(
            ErrorKind::TooManyRedirects,
            format!("too many redirects from {}", url),
        )
    }

    pub fn cancelled(stage: &str) -> Self {
        Self::new(ErrorKind::Cancelled, format!("cancelled during {}", stage))
    }
}

/// The terminal record of one processed job
///
/// Built by exactly one worker and never modified once published.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The location the job was created for
    pub location: Url,

    /// Where the renderer ended up after redirects
    pub final_location: Option<Url>,

    /// Extracted page text; empty on failure
    pub content: String,

    /// Unique normalized links found on the page
    pub links: Vec<Url>,

    pub depth: u32,

    /// Summary of `content`; empty when summarization failed or was skipped
    pub summary: String,

    pub error: Option<JobError>,

    pub fetched_at: DateTime<Utc>,
}

impl CrawlResult {
    pub(crate) fn for_job(job: &Job) -> Self {
        Self {
            location: job.location.clone(),
            final_location: None,
            content: String::new(),
            links: Vec::new(),
            depth: job.depth,
            summary: String::new(),
            error: None,
            fetched_at: Utc::now(),
        }
    }

    pub(crate) fn failed(job: &Job, error: JobError) -> Self {
        let mut result = Self::for_job(job);
        result.final_location = error.final_location.clone();
        result.error = Some(error);
        result
    }

    /// True when the job produced usable content and links
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
