//! Asset sink trait and job type
//!
//! The Asset Harvester does not download anything itself: it hands each
//! discovered document link to a sink, which owns the actual transfer.

use crate::CrawlError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A document link waiting for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetJob {
    /// Absolute, normalized document URL
    pub source_url: String,

    /// Directory the downloader should place the file in
    pub target_dir: PathBuf,
}

impl AssetJob {
    pub fn new(source_url: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            target_dir: target_dir.into(),
        }
    }
}

/// Trait for asset download queues
///
/// Implementations must be thread-safe: every crawl worker submits to the
/// same sink concurrently.
#[async_trait]
pub trait AssetSink: Send + Sync {
    /// Enqueues one asset job
    ///
    /// # Arguments
    ///
    /// * `job` - The document to download and where to put it
    async fn submit(&self, job: AssetJob) -> Result<(), CrawlError>;

    /// Flushes anything buffered; called once when the crawl ends
    async fn finish(&self) -> Result<(), CrawlError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_job_serializes_flat() {
        let job = AssetJob::new("https://example.org/files/a.pdf", "data/html");
        let line = serde_json::to_string(&job).unwrap();
        assert_eq!(
            line,
            r#"{"source_url":"https://example.org/files/a.pdf","target_dir":"data/html"}"#
        );
    }
}
