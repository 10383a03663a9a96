//! What a crawl does with each fetched page
//!
//! The worker loop is the same for both crawl modes; only the artifact
//! differs. A page crawl writes page bodies to disk and follows links within
//! the scope filter. An asset harvest writes nothing itself: it hands document
//! links to an asset sink and follows every page link within one domain.

use crate::config::{AssetConfig, CrawlMode};
use crate::crawler::dedup::DedupIndex;
use crate::crawler::parser::{ExtractedLinks, Link};
use crate::output::{AssetJob, AssetSink, Counter, CrawlStats};
use crate::renderer::FetchedPage;
use crate::storage::PageStore;
use crate::url::{normalize_url, ScopeFilter};
use crate::CrawlError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Trait for crawl modes
#[async_trait]
pub trait CrawlStrategy: Send + Sync {
    fn mode(&self) -> CrawlMode;

    /// Produces the mode's artifact for one fetched page
    ///
    /// An error fails the task; its links are still followed.
    async fn persist(&self, page: &FetchedPage, links: &ExtractedLinks) -> Result<(), CrawlError>;

    /// Candidate URLs to offer to the Frontier at the next depth
    fn follow(&self, links: &ExtractedLinks) -> Vec<Url>;

    /// Called once after the last worker exits
    async fn finish(&self) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// Persists every in-scope page
pub struct PageCrawl {
    store: PageStore,
    scope: ScopeFilter,

    /// Document extensions never followed as pages; lower-case, no dot
    skip_extensions: Vec<String>,

    stats: Arc<CrawlStats>,
}

impl PageCrawl {
    pub fn new(
        store: PageStore,
        scope: ScopeFilter,
        skip_extensions: &[String],
        stats: Arc<CrawlStats>,
    ) -> Self {
        Self {
            store,
            scope,
            skip_extensions: lowercase_extensions(skip_extensions),
            stats,
        }
    }
}

#[async_trait]
impl CrawlStrategy for PageCrawl {
    fn mode(&self) -> CrawlMode {
        CrawlMode::Page
    }

    async fn persist(&self, page: &FetchedPage, _links: &ExtractedLinks) -> Result<(), CrawlError> {
        if !page.is_html() {
            return Err(CrawlError::NotHtml {
                url: page.url.to_string(),
                content_type: page.content_type.clone().unwrap_or_default(),
            });
        }

        let path = self.store.write_page(&page.url, &page.body).await?;
        tracing::debug!("Persisted {} -> {}", page.url, path.display());

        if let Some(png) = &page.snapshot {
            // A missing snapshot never fails the page
            if let Err(e) = self.store.write_snapshot(&page.url, png).await {
                tracing::warn!("Failed to write snapshot for {}: {}", page.url, e);
            }
        }

        Ok(())
    }

    fn follow(&self, links: &ExtractedLinks) -> Vec<Url> {
        let follow: Vec<Url> = links
            .in_scope(&self.scope)
            .filter(|url| !has_extension(url, &self.skip_extensions))
            .cloned()
            .collect();

        let candidates = links.iter().filter(|link| !link.download).count();
        record_rejected(&self.stats, candidates - follow.len());

        follow
    }
}

/// Queues linked documents for download
pub struct AssetHarvest {
    domain: ScopeFilter,

    /// Lower-case, without the dot
    extensions: Vec<String>,

    /// Assets already queued in this run
    queued: DedupIndex,

    sink: Arc<dyn AssetSink>,
    target_dir: PathBuf,
    stats: Arc<CrawlStats>,
}

impl AssetHarvest {
    pub fn new(
        config: &AssetConfig,
        sink: Arc<dyn AssetSink>,
        target_dir: impl Into<PathBuf>,
        stats: Arc<CrawlStats>,
    ) -> Self {
        Self {
            domain: ScopeFilter::domain(&config.domain),
            extensions: lowercase_extensions(&config.extensions),
            queued: DedupIndex::new(),
            sink,
            target_dir: target_dir.into(),
            stats,
        }
    }

    /// True if the link points at a downloadable document
    pub fn is_asset(&self, link: &Link) -> bool {
        link.download || has_extension(&link.url, &self.extensions)
    }
}

#[async_trait]
impl CrawlStrategy for AssetHarvest {
    fn mode(&self) -> CrawlMode {
        CrawlMode::Asset
    }

    async fn persist(&self, page: &FetchedPage, links: &ExtractedLinks) -> Result<(), CrawlError> {
        let mut found = 0;

        for link in links.iter() {
            if !self.is_asset(link) || !self.domain.admits(&link.url) {
                continue;
            }

            let url = normalize_url(link.url.as_str())?;
            if !self.queued.try_claim(&url) {
                continue;
            }

            self.sink
                .submit(AssetJob::new(url.as_str(), self.target_dir.clone()))
                .await?;
            self.stats.record(Counter::AssetQueued);
            found += 1;
        }

        if found > 0 {
            tracing::debug!("Queued {} assets from {}", found, page.url);
        }

        Ok(())
    }

    fn follow(&self, links: &ExtractedLinks) -> Vec<Url> {
        let pages: Vec<&Link> = links.iter().filter(|link| !self.is_asset(link)).collect();
        let follow: Vec<Url> = pages
            .iter()
            .filter(|link| self.domain.admits(&link.url))
            .map(|link| link.url.clone())
            .collect();

        record_rejected(&self.stats, pages.len() - follow.len());
        follow
    }

    async fn finish(&self) -> Result<(), CrawlError> {
        self.sink.finish().await
    }
}

fn lowercase_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect()
}

/// True if the URL's last path segment ends in one of `extensions`
fn has_extension(url: &Url, extensions: &[String]) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            extensions.iter().any(|e| *e == ext)
        }
        None => false,
    }
}

/// Counts links dropped by the scope before they reach the Frontier
fn record_rejected(stats: &CrawlStats, count: usize) {
    for _ in 0..count {
        stats.record(Counter::Rejected);
    }
}
