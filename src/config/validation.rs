use crate::config::types::{Config, CrawlerConfig, DownloaderConfig, StorageBackend, StorageConfig};
use crate::url::UrlSensitivity;
use crate::ConfigError;
use regex::Regex;

/// Upper bound on concurrent downloads
const MAX_THREADS: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_downloader_config(&config.downloader)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates crawl scope and limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_seed(config)?;

    if config.max_threads < 1 || config.max_threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "max-threads must be between 1 and {}, got {}",
            MAX_THREADS, config.max_threads
        )));
    }

    if config.max_crawl_count == Some(0) {
        return Err(ConfigError::Validation(
            "max-crawl-count must be >= 1 when set".to_string(),
        ));
    }

    if config.max_crawl_time_secs == Some(0) {
        return Err(ConfigError::Validation(
            "max-crawl-time-secs must be >= 1 when set".to_string(),
        ));
    }

    for pattern in config.include.iter().chain(&config.exclude) {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid regex '{}': {}", pattern, e))
        })?;
    }

    for pattern in config.include_hosts.iter().chain(&config.exclude_hosts) {
        validate_host_pattern(pattern)?;
    }

    let sensitivity = UrlSensitivity::from_components(&config.url_sensitivity)
        .map_err(|e| ConfigError::Validation(format!("url-sensitivity: {}", e)))?;
    if sensitivity.is_empty() {
        return Err(ConfigError::Validation(
            "url-sensitivity must name at least one URL component".to_string(),
        ));
    }

    Ok(())
}

/// The seed must be an absolute http(s) URL with a host
fn validate_seed(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = &config.seed;

    if !matches!(seed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use the http or https scheme",
            seed
        )));
    }

    if seed.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates downloader configuration
fn validate_downloader_config(config: &DownloaderConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.download_buffer_size < 1 {
        return Err(ConfigError::Validation(
            "download-buffer-size must be >= 1".to_string(),
        ));
    }

    if config.max_content_size == Some(0) {
        return Err(ConfigError::Validation(
            "max-content-size must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    match &config.path {
        Some(path) if path.as_os_str().is_empty() => Err(ConfigError::Validation(
            "storage path cannot be empty".to_string(),
        )),
        None if config.backend != StorageBackend::Memory => Err(ConfigError::Validation(
            format!("storage backend {:?} requires a path", config.backend),
        )),
        _ => Ok(()),
    }
}

/// Validates a host pattern (supports a leading `*.` wildcard, or `*` alone)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    if pattern == "*" {
        return Ok(());
    }

    validate_host_string(pattern.strip_prefix("*.").unwrap_or(pattern))
}

/// Validates a host name (without wildcard prefix)
fn validate_host_string(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern("Host cannot be empty".to_string()));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
