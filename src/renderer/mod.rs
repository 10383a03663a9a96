//! Renderer module: retrieving page content
//!
//! # Components
//!
//! - `Renderer`: the fetch contract shared by all engines
//! - `BrowserRenderer`: headless Chromium, for pages whose navigation is
//!   built by script
//! - `HttpRenderer`: a plain GET, for static pages
//! - `fetch_with_retry`: exponential backoff around any renderer

mod browser;
mod http;
mod retry;
mod user_agents;

pub use browser::{BrowserRenderer, BROWSER_EXECUTABLE_ENV};
pub use http::{build_http_client, classify_status, HttpRenderer};
pub use retry::{fetch_with_retry, RetryPolicy};
pub use user_agents::UserAgentPool;

use crate::config::{Config, CrawlMode, RendererEngine};
use crate::state::CrawlTask;
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

/// Rendered content of one URL
///
/// Lives only between the fetch and the storage write.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The task URL; the page's identity on disk
    pub url: Url,

    /// Where the content actually came from, after redirects
    pub final_url: Url,

    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,

    /// Full-page PNG, when the renderer takes snapshots
    pub snapshot: Option<Vec<u8>>,
}

impl FetchedPage {
    /// True unless the server declared a non-HTML content type
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => true,
        }
    }
}

/// Trait for page renderers
///
/// Implementations must be thread-safe: every worker calls `fetch`
/// concurrently on the same instance.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Retrieves the task's URL
    ///
    /// Bounded by the renderer's timeout. Timeouts and transport failures
    /// come back as transient [`FetchError`]s.
    async fn fetch(&self, task: &CrawlTask) -> Result<FetchedPage, FetchError>;

    /// Short engine name for logs
    fn name(&self) -> &'static str;
}

/// Builds the renderer selected by the configuration
///
/// Snapshots are only taken in page mode; asset harvesting persists no pages.
pub async fn build_renderer(config: &Config) -> Result<Arc<dyn Renderer>, CrawlError> {
    let renderer: Arc<dyn Renderer> = match config.renderer.engine {
        RendererEngine::Browser => {
            let screenshots =
                config.renderer.screenshots && config.crawler.mode == CrawlMode::Page;
            Arc::new(BrowserRenderer::launch(&config.renderer, screenshots).await?)
        }
        RendererEngine::Http => Arc::new(HttpRenderer::from_config(&config.renderer)?),
    };

    tracing::info!("Renderer: {}", renderer.name());
    Ok(renderer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: Option<&str>) -> FetchedPage {
        let url = Url::parse("https://example.org/").unwrap();
        FetchedPage {
            url: url.clone(),
            final_url: url,
            body: Vec::new(),
            content_type: content_type.map(|s| s.to_string()),
            fetched_at: Utc::now(),
            snapshot: None,
        }
    }

    #[test]
    fn test_is_html() {
        assert!(page(Some("text/html; charset=utf-8")).is_html());
        assert!(page(Some("application/xhtml+xml")).is_html());
        assert!(page(None).is_html());
        assert!(!page(Some("application/pdf")).is_html());
    }

    #[tokio::test]
    async fn test_build_http_renderer() {
        let mut config = Config::default();
        config.renderer.engine = RendererEngine::Http;
        let renderer = build_renderer(&config).await.unwrap();
        assert_eq!(renderer.name(), "http");
    }
}
