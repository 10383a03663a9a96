//! Crawler module for page discovery and persistence
//!
//! This module contains the core crawling logic, including:
//! - The Frontier with its depth budget and Dedup Index
//! - HTML parsing and link extraction
//! - The page-crawl and asset-harvest strategies
//! - Overall crawl coordination

mod coordinator;
mod dedup;
mod frontier;
mod parser;
mod strategy;

pub use coordinator::Coordinator;
pub use dedup::DedupIndex;
pub use frontier::{Admission, Frontier};
pub use parser::{extract_links, ExtractedLinks, Link};
pub use strategy::{AssetHarvest, CrawlStrategy, PageCrawl};

pub use crate::output::CrawlSummary;

use crate::config::Config;
use crate::renderer::build_renderer;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Launch the configured renderer
/// 2. Seed the Frontier with the active mode's seeds
/// 3. Fetch, persist and follow links until the Frontier is exhausted
/// 4. Return the run summary
///
/// # Arguments
///
/// * `config` - A validated crawler configuration
/// * `cancel` - Fires on external shutdown; the run then drains and returns
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed or was cancelled cleanly
/// * `Err(CrawlError)` - Crawl could not start or finish
pub async fn crawl(config: Config, cancel: CancellationToken) -> crate::Result<CrawlSummary> {
    let renderer = build_renderer(&config).await?;
    Coordinator::new(config, renderer).run(cancel).await
}
