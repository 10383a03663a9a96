//! Output module for crawl statistics and asset queues
//!
//! This module handles:
//! - Counting task outcomes while the crawl runs
//! - Printing the final crawl summary
//! - Handing discovered assets to a download queue

mod assets;
pub mod stats;
mod traits;

pub use assets::JsonlAssetQueue;
pub use stats::{print_summary, CrawlStats, CrawlSummary, Counter, StatsSnapshot};
pub use traits::{AssetJob, AssetSink};
