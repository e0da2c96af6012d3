use crate::config::types::{Config, SummarizerKind};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// A path that does not exist yields the default configuration. Environment
/// overrides are applied on top of the file before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        tracing::warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

/// Builds the default configuration with environment overrides applied
pub fn default_config() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Applies environment variable overrides to a configuration
///
/// Recognised variables: `CRAWLER_MAX_DEPTH`, `SUMMARIZER_TYPE`, `OLLAMA_URL`
/// and `OLLAMA_MODEL`. Values that fail to parse are ignored.
///
/// # Arguments
///
/// * `config` - The configuration to update in place
/// * `lookup` - Resolves a variable name to its value, if set
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(depth) = lookup("CRAWLER_MAX_DEPTH") {
        match depth.trim().parse::<u32>() {
            Ok(depth) => config.crawler.max_depth = depth,
            Err(_) => tracing::warn!("Ignoring invalid CRAWLER_MAX_DEPTH value: {}", depth),
        }
    }

    if let Some(kind) = lookup("SUMMARIZER_TYPE").filter(|v| !v.is_empty()) {
        match SummarizerKind::from_name(&kind) {
            Some(kind) => config.summarizer.kind = kind,
            None => tracing::warn!("Ignoring unsupported SUMMARIZER_TYPE: {}", kind),
        }
    }

    if let Some(url) = lookup("OLLAMA_URL").filter(|v| !v.is_empty()) {
        config.summarizer.url = url;
    }

    if let Some(model) = lookup("OLLAMA_MODEL").filter(|v| !v.is_empty()) {
        config.summarizer.model = model;
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that runs can be matched to the configuration that
/// produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns it with the file hash, when a file exists
pub fn load_config_with_hash(path: &Path) -> Result<(Config, Option<String>), ConfigError> {
    let config = load_config(path)?;
    let hash = if path.exists() {
        Some(compute_config_hash(path)?)
    } else {
        None
    };
    Ok((config, hash))
}
