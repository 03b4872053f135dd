//! HTTP Client Module
//!
//! Two tuned reqwest clients behind one fetcher:
//! - feed client: short timeout, feed-reader user agent
//! - page client: longer timeout, desktop browser user agent so static
//!   scrapes are served the same markup a reader would see
//!
//! There are no inline retries. A failed request surfaces as an error here and
//! degrades to an empty result one level up; the next refresh cycle is the
//! retry.

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::{IngestionError, Result};

pub const DEFAULT_FEED_USER_AGENT: &str =
    concat!("newshub-ingestion/", env!("CARGO_PKG_VERSION"), " (+feed reader)");

pub const DEFAULT_BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout for feed downloads
    pub feed_timeout: Duration,
    /// Whole-request timeout for static page downloads
    pub page_timeout: Duration,
    /// Connection timeout (both clients)
    pub connect_timeout: Duration,
    pub feed_user_agent: String,
    pub browser_user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            feed_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            feed_user_agent: DEFAULT_FEED_USER_AGENT.to_string(),
            browser_user_agent: DEFAULT_BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Fetches feed documents and static pages
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    feed_client: Client,
    page_client: Client,
    config: HttpClientConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let feed_client = Client::builder()
            .timeout(config.feed_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.feed_user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        let page_client = Client::builder()
            .timeout(config.page_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.browser_user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            feed_client,
            page_client,
            config,
        })
    }

    /// Creates a fetcher with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Downloads a feed document as raw bytes
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        let response = Self::get(&self.feed_client, url, self.config.feed_timeout).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify(e, self.config.feed_timeout))?;
        Ok(body.to_vec())
    }

    /// Downloads a page as text, decoded per its declared charset
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = Self::get(&self.page_client, url, self.config.page_timeout).await?;
        response
            .text()
            .await
            .map_err(|e| Self::classify(e, self.config.page_timeout))
    }

    async fn get(client: &Client, url: &str, timeout: Duration) -> Result<Response> {
        debug!(url = %url, "Executing HTTP request");

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestionError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(url = %url, status = %status, "Request succeeded");
        Ok(response)
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> IngestionError {
        if error.is_timeout() {
            IngestionError::Timeout(timeout)
        } else {
            IngestionError::HttpError(error)
        }
    }
}
