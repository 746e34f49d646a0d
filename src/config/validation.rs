use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl scope and selectors
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    validate_seed_url(&config.seed_url)?;

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    if config.selectors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one selector is required".to_string(),
        ));
    }

    for selector in &config.selectors {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "selectors cannot be empty".to_string(),
            ));
        }
        Selector::parse(selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid selector '{}': {:?}", selector, e))
        })?;
    }

    Ok(())
}

/// Validates a seed URL: must parse and use HTTP or HTTPS
pub(crate) fn validate_seed_url(seed: &str) -> ConfigResult<()> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates HTTP transport settings
fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }

    if config.jsonl_path.is_empty() {
        return Err(ConfigError::Validation(
            "jsonl_path cannot be empty".to_string(),
        ));
    }

    if config.csv_path == config.jsonl_path {
        return Err(ConfigError::Validation(format!(
            "csv_path and jsonl_path must differ, both are '{}'",
            config.csv_path
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
pub(crate) fn validate_domain_pattern(pattern: &str) -> ConfigResult<()> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
///
/// Single-label hosts such as `localhost` are accepted.
fn validate_domain_string(domain: &str) -> ConfigResult<()> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
