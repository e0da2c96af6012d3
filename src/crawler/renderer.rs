//! Page renderer collaborator
//!
//! The crawl engine only needs "URL in, text and links out". [`Renderer`] is
//! that seam; [`HttpRenderer`] is the production implementation built on
//! reqwest and scraper. Its HTTP client is an owned, lazily built handle with
//! an explicit start/shutdown lifecycle rather than a process-wide global.

use crate::config::RendererConfig;
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::job::JobError;
use crate::crawler::parser::parse_html;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use url::Url;

/// What a renderer extracted from one page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Where the request ended up after redirects
    pub final_url: Url,

    /// Readable page text
    pub text: String,

    /// Absolute outbound links, resolved against `final_url`
    pub links: Vec<String>,
}

/// Fetches a location and extracts its text and outbound links
///
/// Implementations apply their own per-call timeout and report navigation or
/// extraction failures as a [`JobError`], never as partial output.
///
/// When `allowed_host` is set and the final location's host does not contain
/// it, `render` fails with `DisallowedHost` without extracting anything.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquires whatever the renderer needs before the first call
    async fn start(&self) -> Result<(), HarvestError> {
        Ok(())
    }

    async fn render(
        &self,
        location: &Url,
        allowed_host: Option<&str>,
    ) -> Result<RenderedPage, JobError>;

    /// Releases resources; later `render` calls should fail
    async fn shutdown(&self) {}
}

/// Renderer backed by a plain HTTP GET and static HTML extraction
pub struct HttpRenderer {
    config: RendererConfig,
    client: OnceCell<Client>,
    stopped: AtomicBool,
}

impl HttpRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            stopped: AtomicBool::new(false),
        }
    }

    async fn client(&self) -> Result<&Client, reqwest::Error> {
        self.client
            .get_or_try_init(|| async {
                tracing::debug!("Building HTTP client for renderer");
                build_http_client(&self.config)
            })
            .await
    }

    pub fn is_started(&self) -> bool {
        self.client.initialized() && !self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn start(&self) -> Result<(), HarvestError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(HarvestError::RendererStart(
                "renderer has been shut down".to_string(),
            ));
        }
        self.client().await?;
        tracing::info!("HTTP renderer started");
        Ok(())
    }

    async fn render(
        &self,
        location: &Url,
        allowed_host: Option<&str>,
    ) -> Result<RenderedPage, JobError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(JobError::render("renderer has been shut down"));
        }

        let client = self
            .client()
            .await
            .map_err(|e| JobError::render(format!("failed to build HTTP client: {}", e)))?;

        let page = fetch_page(client, location, allowed_host).await?;
        let parsed = parse_html(&page.body, &page.final_url);
        tracing::debug!(
            "Extracted {} chars and {} links from {}",
            parsed.text.len(),
            parsed.links.len(),
            page.final_url
        );

        Ok(RenderedPage {
            final_url: page.final_url,
            text: parsed.text,
            links: parsed.links,
        })
    }

    async fn shutdown(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("HTTP renderer shut down");
        }
    }
}
