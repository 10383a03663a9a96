//! Scopecrawl: a domain-scoped page crawler and asset harvester
//!
//! This crate discovers every in-scope page under a web domain, persists each
//! page exactly once under a deterministic on-disk identity, and separately
//! queues linked binary documents for bulk download.

pub mod config;
pub mod crawler;
pub mod output;
pub mod renderer;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("Storage path error: {0}")]
    StoragePath(#[from] StoragePathError),

    #[error("{url} is not an HTML page ({content_type})")]
    NotHtml { url: String, content_type: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("Asset queue error: {0}")]
    AssetQueue(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// Every variant is fatal: the crawl aborts before any fetch begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid scope pattern: {0}")]
    InvalidPattern(String),

    #[error("Output directory {path} cannot be created: {source}")]
    OutputDirectory {
        path: String,
        source: std::io::Error,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// A failed fetch attempt
///
/// Transient failures (timeouts, resets, 5xx) are retried with backoff by
/// the crawler; permanent ones (404 and friends) fail the task immediately.
#[derive(Debug, Clone, Error)]
#[error("Fetch failed for {url}: {reason}")]
pub struct FetchError {
    pub url: String,
    pub transient: bool,
    pub reason: String,
}

impl FetchError {
    pub fn transient(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transient: true,
            reason: reason.into(),
        }
    }

    pub fn permanent(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transient: false,
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

/// Failure to map a URL onto a safe filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoragePathError {
    #[error("URL {0} has no usable path segments")]
    Empty(String),

    #[error("URL {0} resolves outside the output root")]
    EscapesRoot(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlMode, StorageMode};
pub use crawler::{crawl, CrawlSummary};
pub use state::TaskState;
pub use crate::url::{extract_domain, normalize_url, ScopeFilter};
