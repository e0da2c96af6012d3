use serde::Deserialize;
use std::time::Duration;

/// Default browser-like user agent sent with every page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub renderer: RendererConfig,
    pub summarizer: SummarizerConfig,
}

/// Crawl engine behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from the seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Global request rate across all workers (requests per second)
    pub rate: f64,

    /// Number of concurrent workers, also the frontier capacity
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Substring the final host of every fetched page must contain
    #[serde(rename = "allowed-host")]
    pub allowed_host: Option<String>,
}

impl CrawlerConfig {
    /// Minimum spacing between two permits of the global rate limiter
    pub fn permit_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            rate: 1.0,
            max_workers: 5,
            allowed_host: None,
        }
    }
}

/// HTTP page renderer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// User agent header sent with page requests
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum redirect hops before the page is abandoned
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// Which summarization backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerKind {
    #[default]
    Ollama,
}

impl SummarizerKind {
    /// Parses a backend name, as accepted by the `SUMMARIZER_TYPE` override
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Content summarizer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub kind: SummarizerKind,

    /// Base URL of the Ollama server
    pub url: String,

    /// Model name passed to the generate endpoint
    pub model: String,

    /// Input ceiling in characters; longer text keeps only its head and tail
    #[serde(rename = "max-input-chars")]
    pub max_input_chars: usize,

    /// Total attempts per summary, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff unit; attempt `n` waits `n * backoff-ms` before retrying
    #[serde(rename = "backoff-ms")]
    pub backoff_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            kind: SummarizerKind::Ollama,
            url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            max_input_chars: 12_000,
            max_attempts: 3,
            backoff_ms: 1000,
            timeout_secs: 120,
        }
    }
}
