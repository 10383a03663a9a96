//! Configuration module for Scopecrawl
//!
//! This module handles loading, parsing, overriding and validating the crawl
//! configuration. The result is an immutable value handed to the Frontier,
//! the Scope Filter and the Storage Path Resolver at construction.
//!
//! # Example
//!
//! ```no_run
//! use scopecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scopecrawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    AssetConfig, Config, CrawlMode, CrawlerConfig, OutputConfig, RendererConfig, RendererEngine,
    ScopeConfig, StorageMode,
};

pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, prepare_output_directory,
    ConfigOverrides,
};
pub use validation::validate;
