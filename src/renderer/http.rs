//! Plain HTTP renderer
//!
//! This module handles pages that need no script execution:
//! - Building the HTTP client with timeouts and compression
//! - GET requests with a rotated user agent per request
//! - Error classification into transient and permanent failures

use crate::config::RendererConfig;
use crate::renderer::{FetchedPage, Renderer, UserAgentPool};
use crate::state::CrawlTask;
use crate::FetchError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// The user agent is not set here: it is rotated per request.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a non-success HTTP status to a fetch error
///
/// | Status | Classification |
/// |--------|----------------|
/// | 408, 429 | transient |
/// | 5xx | transient |
/// | anything else | permanent |
pub fn classify_status(url: &str, status: StatusCode) -> FetchError {
    let reason = format!("HTTP {}", status.as_u16());
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        FetchError::transient(url, reason)
    } else {
        FetchError::permanent(url, reason)
    }
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::transient(url, "Request timeout")
    } else if error.is_connect() {
        FetchError::transient(url, format!("Connection failed: {}", error))
    } else if error.is_redirect() {
        FetchError::permanent(url, format!("Redirect error: {}", error))
    } else if error.is_builder() {
        FetchError::permanent(url, error.to_string())
    } else {
        FetchError::transient(url, error.to_string())
    }
}

/// Fetches pages with a single GET request
pub struct HttpRenderer {
    client: Client,
    user_agents: UserAgentPool,
}

impl HttpRenderer {
    pub fn new(client: Client, user_agents: UserAgentPool) -> Self {
        Self {
            client,
            user_agents,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(client, UserAgentPool::from_config(config)))
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn fetch(&self, task: &CrawlTask) -> Result<FetchedPage, FetchError> {
        let url = task.url.as_str();

        let response = self
            .client
            .get(task.url.clone())
            .header(USER_AGENT, self.user_agents.pick())
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        Ok(FetchedPage {
            url: task.url.clone(),
            final_url,
            body: body.to_vec(),
            content_type,
            fetched_at: Utc::now(),
            snapshot: None,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
