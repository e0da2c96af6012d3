//! Content summarizer collaborator
//!
//! [`Summarizer`] condenses extracted page text. [`OllamaSummarizer`] talks to
//! an Ollama server's `/api/generate` endpoint, truncating long input to its
//! head and tail and retrying transient failures with linear backoff.

use crate::config::{SummarizerConfig, SummarizerKind};
use crate::crawler::job::ErrorKind;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Marker placed between the head and tail of truncated input
pub const TRUNCATION_MARKER: &str = "\n...\n";

/// Summarization failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizeError {
    #[error("empty input text")]
    EmptyInput,

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("summarizer backend error: {0}")]
    Backend(String),

    #[error("summarizer returned an empty response")]
    EmptyResponse,

    #[error("failed to generate summary after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl SummarizeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Summarization
    }
}

/// Condenses page text into a summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Builds the summarizer selected by the configuration
pub fn build_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>, ConfigError> {
    match config.kind {
        SummarizerKind::Ollama => Ok(Arc::new(OllamaSummarizer::new(config.clone())?)),
    }
}

/// Shortens text longer than `max_chars` to its head and tail
///
/// The ceiling is split evenly: the first `max_chars / 2` and the last
/// `max_chars / 2` characters are kept, joined by [`TRUNCATION_MARKER`].
/// Counting is by `char`, so multi-byte text is never split mid-character.
///
/// # Examples
///
/// ```
/// use sumi_harvest::crawler::truncate_for_summary;
///
/// assert_eq!(truncate_for_summary("short", 10), "short");
/// assert_eq!(truncate_for_summary("abcdefghij", 4), "ab\n...\nij");
/// ```
pub fn truncate_for_summary(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }

    let half = max_chars / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();
    format!("{}{}{}", head, TRUNCATION_MARKER, tail)
}

/// Builds the structured-summary prompt sent to the model
fn build_prompt(text: &str) -> String {
    format!(
        "You are a helpful AI assistant. Create a structured summary of this text with:\n\n\
         1. Key Points (3-4 bullet points)\n\
         2. Important Terms (3-4 terms with brief explanations)\n\
         3. Main Takeaways (2-3 points)\n\n\
         Text: {}\n\n\
         Remember to be concise and specific.",
        text
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

/// Summarizer backed by a local Ollama server
pub struct OllamaSummarizer {
    client: Client,
    endpoint: String,
    config: SummarizerConfig,
}

impl OllamaSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Validation(format!("failed to build summarizer client: {}", e)))?;

        let endpoint = format!("{}/api/generate", config.url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// One generate call, no retries
    async fn request_once(&self, prompt: &str) -> Result<String, SummarizeError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizeError::Request(e.to_string()))?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::Decode(e.to_string()))?;

        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return Err(SummarizeError::Backend(error));
        }

        if parsed.response.trim().is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }

        Ok(parsed.response)
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        tracing::debug!("Summarizer input length: {} characters", text.chars().count());
        let prompt = build_prompt(&truncate_for_summary(text, self.config.max_input_chars));

        retry_with_backoff(self.config.max_attempts, self.config.backoff_ms, |_| {
            self.request_once(&prompt)
        })
        .await
    }
}

/// Runs `op` up to `max_attempts` times, sleeping `attempt × backoff_ms`
/// after each failed attempt except the last
async fn retry_with_backoff<F, Fut>(
    max_attempts: u32,
    backoff_ms: u64,
    mut op: F,
) -> Result<String, SummarizeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, SummarizeError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        tracing::debug!("Attempt {} of {} to generate summary", attempt, max_attempts);

        match op(attempt).await {
            Ok(summary) => return Ok(summary),
            Err(e) if attempt >= max_attempts => {
                return Err(SummarizeError::Exhausted {
                    attempts: max_attempts,
                    last: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Summary attempt {} failed: {}. Retrying...", attempt, e);
                let backoff = Duration::from_millis(backoff_ms * u64::from(attempt));
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
