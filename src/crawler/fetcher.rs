//! HTTP fetcher implementation
//!
//! This module handles the network half of page rendering:
//! - Building HTTP clients with the configured user agent and limits
//! - GET requests with redirect following (bounded hop count)
//! - Content-Type checks
//! - Error classification into per-job error kinds

use crate::config::RendererConfig;
use crate::crawler::job::JobError;
use crate::url::is_allowed_host;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// A successfully downloaded HTML document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: String,
    /// Page body content
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The renderer configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::RendererConfig;
/// use sumi_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&RendererConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &RendererConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and checks that it is HTML
///
/// The host filter is applied to the post-redirect URL as soon as the
/// response arrives, before the status or body is looked at.
///
/// # Error Mapping
///
/// | Condition | Kind |
/// |-----------|------|
/// | Redirect chain over the limit | TooManyRedirects |
/// | Timeout / connection failure | Network |
/// | Final host outside `allowed_host` | DisallowedHost |
/// | Non-2xx status | Network |
/// | Content-Type without `text/html` | NonHtmlContent |
/// | Body could not be decoded | Render |
///
/// Every error raised after a response arrived carries the final URL.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `allowed_host` - Optional host substring filter
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    allowed_host: Option<&str>,
) -> Result<FetchedPage, JobError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify_request_error(url, &e))?;

    let status = response.status();
    let final_url = response.url().clone();
    tracing::debug!(
        "Response for {} - status {}, final URL {}",
        url,
        status,
        final_url
    );

    if !is_allowed_host(&final_url, allowed_host) {
        return Err(JobError::disallowed_host(&final_url).at(final_url));
    }

    if !status.is_success() {
        return Err(JobError::network(format!("HTTP {}", status.as_u16())).at(final_url));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.to_lowercase().contains("text/html") {
        return Err(JobError::non_html(&content_type).at(final_url));
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            let message = format!("failed to read body of {}: {}", final_url, e);
            return Err(JobError::render(message).at(final_url));
        }
    };

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Maps a reqwest transport error to a per-job error
fn classify_request_error(url: &Url, error: &reqwest::Error) -> JobError {
    if error.is_redirect() {
        JobError::too_many_redirects(url)
    } else if error.is_timeout() {
        JobError::network(format!("request timeout for {}", url))
    } else if error.is_connect() {
        JobError::network(format!("connection failed for {}: {}", url, error))
    } else {
        JobError::network(format!("failed to fetch {}: {}", url, error))
    }
}
