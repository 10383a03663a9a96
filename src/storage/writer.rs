//! Page persistence
//!
//! Pages and snapshots are written atomically: bytes go to a sibling
//! `.part` file which is then renamed over the target. A crash mid-write
//! leaves the previous version (or nothing) in place, never a torn file.

use crate::storage::resolver::StorageResolver;
use crate::CrawlError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

const PARTIAL_SUFFIX: &str = "part";

/// Writes bytes to `path` atomically, creating parent directories
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = partial_path(path);
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Resolves and writes pages and their snapshots
#[derive(Debug, Clone)]
pub struct PageStore {
    resolver: StorageResolver,
}

impl PageStore {
    pub fn new(resolver: StorageResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &StorageResolver {
        &self.resolver
    }

    /// Persists a rendered page, overwriting any earlier copy
    pub async fn write_page(&self, url: &Url, body: &[u8]) -> Result<PathBuf, CrawlError> {
        let path = self.resolver.resolve(url)?;
        write_atomic(&path, body).await?;
        tracing::debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(path)
    }

    /// Persists a full-page PNG snapshot
    pub async fn write_snapshot(&self, url: &Url, png: &[u8]) -> Result<PathBuf, CrawlError> {
        let path = self.resolver.snapshot_path(url);
        write_atomic(&path, png).await?;
        tracing::trace!("Snapshot {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageMode;
    use crate::StoragePathError;
    use tempfile::TempDir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_leaves_no_partial() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/page.html");

        write_atomic(&target, b"<html></html>").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"<html></html>");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn test_rewrite_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(StorageResolver::new(
            dir.path(),
            StorageMode::Flat,
            "html",
        ));
        let page = url("https://example.org/docs/a.html");

        let first = store.write_page(&page, b"one").await.unwrap();
        let second = store.write_page(&page, b"two").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_hierarchical_root_url_is_not_written() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(StorageResolver::new(
            dir.path(),
            StorageMode::Hierarchical,
            "html",
        ));

        let err = store
            .write_page(&url("https://example.org/"), b"root")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CrawlError::StoragePath(StoragePathError::Empty(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_goes_to_snapshot_dir() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(StorageResolver::new(
            dir.path(),
            StorageMode::Hierarchical,
            "html",
        ));

        let path = store
            .write_snapshot(&url("https://example.org/docs/a.html"), b"\x89PNG")
            .await
            .unwrap();

        assert!(path.starts_with(dir.path().join("snapshots")));
        assert!(path.exists());
    }
}
