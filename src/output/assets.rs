//! JSON Lines asset queue
//!
//! Each submitted job becomes one line of `assets.jsonl` under the output
//! directory. An external downloader consumes the file after the crawl.

use crate::output::traits::{AssetJob, AssetSink};
use crate::CrawlError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends asset jobs to a JSON Lines file
pub struct JsonlAssetQueue {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAssetQueue {
    /// Opens (or creates) the queue file in append mode
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::info!("Asset queue: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AssetSink for JsonlAssetQueue {
    async fn submit(&self, job: AssetJob) -> Result<(), CrawlError> {
        let mut line = serde_json::to_string(&job)?;
        line.push('\n');

        // One write per line under the lock keeps lines from interleaving
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn finish(&self) -> Result<(), CrawlError> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}
