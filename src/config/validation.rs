use crate::config::types::{AssetConfig, Config, CrawlMode, CrawlerConfig, OutputConfig, RendererConfig, ScopeConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Upper bound on concurrent fetch workers; each may hold a browser tab
const MAX_CONCURRENCY: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_scope_config(&config.scope)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;

    match config.crawler.mode {
        CrawlMode::Page => validate_page_mode(config)?,
        CrawlMode::Asset => validate_asset_config(&config.assets)?,
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, 0 meaning unlimited

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    Ok(())
}

/// Validates scope rules; every pattern must compile
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    for pattern in &config.patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid scope pattern '{}': {}", pattern, e))
        })?;
    }

    for domain in &config.domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

fn validate_page_mode(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "page crawling needs at least one seed URL".to_string(),
        ));
    }

    if config.scope.patterns.is_empty() && config.scope.domains.is_empty() {
        return Err(ConfigError::Validation(
            "page crawling needs at least one scope pattern or domain".to_string(),
        ));
    }

    Ok(())
}

/// Validates asset harvest configuration
fn validate_asset_config(config: &AssetConfig) -> Result<(), ConfigError> {
    validate_domain_pattern(&config.domain)?;

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "asset harvesting needs at least one seed URL".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    if config.extensions.iter().any(|e| e.is_empty() || e.contains('.')) {
        return Err(ConfigError::Validation(
            "asset extensions must be non-empty and given without the dot".to_string(),
        ));
    }

    validate_file_name("queue_file", &config.queue_file)?;

    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    validate_file_name("extension", &config.extension)?;

    Ok(())
}

fn validate_file_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::Validation(format!(
            "{} must be a plain file name component, got '{}'",
            field, value
        )));
    }
    Ok(())
}

/// Validates a seed URL: absolute, http(s), with a host
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use the http or https scheme",
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

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
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

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
