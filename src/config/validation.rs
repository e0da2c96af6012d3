use crate::config::types::{Config, CrawlerConfig, RendererConfig, SummarizerConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
const MAX_WORKERS: u32 = 100;

/// Smallest input ceiling that still leaves a meaningful head and tail
const MIN_INPUT_CHARS: usize = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_renderer_config(&config.renderer)?;
    validate_summarizer_config(&config.summarizer)?;
    Ok(())
}

/// Validates crawl engine configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if !config.rate.is_finite() || config.rate <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate must be a positive number of requests per second, got {}",
            config.rate
        )));
    }

    if config.max_workers < 1 || config.max_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.max_workers
        )));
    }

    if let Some(host) = &config.allowed_host {
        validate_host_fragment(host)?;
    }

    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "renderer timeouts must be >= 1s, got timeout={}s connect={}s",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.max_redirects < 1 {
        return Err(ConfigError::Validation(
            "max_redirects must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates summarizer configuration
fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid summarizer url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Summarizer url '{}' must use http or https",
            config.url
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }

    if config.max_input_chars < MIN_INPUT_CHARS {
        return Err(ConfigError::Validation(format!(
            "max_input_chars must be >= {}, got {}",
            MIN_INPUT_CHARS, config.max_input_chars
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "summarizer timeout must be >= 1s, got {}s",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates the allowed-host substring
fn validate_host_fragment(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_host cannot be empty when set".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "allowed_host '{}' contains invalid characters",
            host
        )));
    }

    Ok(())
}
