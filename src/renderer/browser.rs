//! Script-executing renderer backed by a headless Chromium
//!
//! One browser process is shared by all workers; every fetch opens its own
//! tab, so concurrent renders never wait on each other. A render is only
//! captured once the page's navigation is complete:
//!
//! 1. the configured marker selector is present
//! 2. the readiness predicate evaluates to `true`
//!
//! Both waits poll until the per-fetch timeout expires.

use crate::config::RendererConfig;
use crate::renderer::{classify_status, FetchedPage, Renderer, UserAgentPool};
use crate::state::CrawlTask;
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use chrono::Utc;
use futures::StreamExt;
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Environment variable naming the Chromium binary
pub const BROWSER_EXECUTABLE_ENV: &str = "BROWSER_EXECUTABLE_PATH";

/// Delay between checks of the marker and the readiness predicate
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound for opening and closing a tab
const TAB_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BrowserRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    user_agents: UserAgentPool,
    timeout: Duration,
    wait_for_selector: Option<String>,
    ready_condition: Option<String>,
    screenshots: bool,
}

impl BrowserRenderer {
    /// Launches the browser process
    ///
    /// `screenshots` overrides the configured flag so callers can turn
    /// snapshots off for crawl modes that persist no pages.
    pub async fn launch(config: &RendererConfig, screenshots: bool) -> Result<Self, CrawlError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        if let Some(executable) = browser_executable(config) {
            tracing::debug!("Using browser executable {}", executable.display());
            builder = builder.chrome_executable(executable);
        }

        let browser_config = builder.build().map_err(CrawlError::Browser)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CrawlError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Browser launched");

        Ok(Self {
            browser,
            handler,
            user_agents: UserAgentPool::from_config(config),
            timeout,
            wait_for_selector: config.wait_for_selector.clone(),
            ready_condition: config.ready_condition.clone(),
            screenshots,
        })
    }

    async fn render(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let page = tokio::time::timeout(TAB_TIMEOUT, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| FetchError::transient(url.as_str(), "timed out opening a tab"))?
            .map_err(|e| FetchError::transient(url.as_str(), format!("failed to open tab: {}", e)))?;

        let result = match tokio::time::timeout(self.timeout, self.capture(&page, url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::transient(
                url.as_str(),
                format!("render timed out after {}s", self.timeout.as_secs()),
            )),
        };

        match tokio::time::timeout(TAB_TIMEOUT, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Failed to close tab for {}: {}", url, e),
            Err(_) => tracing::debug!("Timed out closing tab for {}", url),
        }

        result
    }

    async fn capture(&self, page: &Page, url: &Url) -> Result<FetchedPage, FetchError> {
        let transient = |what: &str, e: chromiumoxide::error::CdpError| {
            FetchError::transient(url.as_str(), format!("{}: {}", what, e))
        };

        page.set_user_agent(self.user_agents.pick())
            .await
            .map_err(|e| transient("set user agent", e))?;

        page.goto(url.as_str())
            .await
            .map_err(|e| transient("navigation failed", e))?;

        // Error pages never show the marker
        let navigation = page
            .wait_for_navigation_response()
            .await
            .map_err(|e| transient("navigation failed", e))?;
        let response = navigation
            .as_ref()
            .and_then(|request| request.response.as_ref());
        check_navigation_status(url, response.map(|r| r.status))?;
        let content_type = response
            .map(|r| r.mime_type.clone())
            .filter(|mime| !mime.is_empty())
            .unwrap_or_else(|| "text/html".to_string());

        if let Some(selector) = &self.wait_for_selector {
            wait_for_selector(page, selector).await;
            tracing::trace!("{}: marker {} present", url, selector);
        }

        if let Some(condition) = &self.ready_condition {
            wait_until_ready(page, condition).await;
            tracing::trace!("{}: ready condition holds", url);
        }

        let html = page
            .content()
            .await
            .map_err(|e| transient("failed to read content", e))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        let snapshot = if self.screenshots {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            match page.screenshot(params).await {
                Ok(png) => Some(png),
                Err(e) => {
                    tracing::warn!("Snapshot of {} failed: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            body: html.into_bytes(),
            content_type: Some(content_type),
            fetched_at: Utc::now(),
            snapshot,
        })
    }
}

impl Drop for BrowserRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn fetch(&self, task: &CrawlTask) -> Result<FetchedPage, FetchError> {
        self.render(&task.url).await
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// Fails the render when the navigation response carries an error status
///
/// A missing response (served from cache, or a `data:` page) is accepted.
fn check_navigation_status(url: &Url, status: Option<i64>) -> Result<(), FetchError> {
    let Some(code) = status else {
        return Ok(());
    };
    match u16::try_from(code).ok().and_then(|c| StatusCode::from_u16(c).ok()) {
        Some(status) if status.is_success() || status.is_redirection() => Ok(()),
        Some(status) => Err(classify_status(url.as_str(), status)),
        None => Err(FetchError::permanent(
            url.as_str(),
            format!("invalid HTTP status {}", code),
        )),
    }
}

/// Polls until an element matching `selector` exists
///
/// Never returns on its own if the marker never shows up; the caller's
/// timeout bounds it.
async fn wait_for_selector(page: &Page, selector: &str) {
    while page.find_element(selector).await.is_err() {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Polls until the JavaScript function expression `condition` returns true
async fn wait_until_ready(page: &Page, condition: &str) {
    let script = invocation(condition);
    loop {
        match page.evaluate(script.as_str()).await {
            Ok(result) => {
                if result.into_value::<bool>().unwrap_or(false) {
                    return;
                }
            }
            Err(e) => tracing::trace!("Ready condition not evaluable yet: {}", e),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wraps a function expression so evaluating it calls the function
fn invocation(condition: &str) -> String {
    format!("({})()", condition.trim())
}

fn browser_executable(config: &RendererConfig) -> Option<PathBuf> {
    config
        .browser_executable
        .clone()
        .or_else(|| std::env::var_os(BROWSER_EXECUTABLE_ENV).map(PathBuf::from))
}
