//! Configuration for the ingestion service
//!
//! Values come from the environment (after `.env` is loaded) with an optional
//! `newshub.{toml,json,yaml}` file underneath. Every key has a default, so an
//! empty environment yields a working in-memory setup with the built-in
//! catalog.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::http_client::{HttpClientConfig, DEFAULT_BROWSER_USER_AGENT, DEFAULT_FEED_USER_AGENT};
use crate::service::ServiceConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Backends; absent means in-memory
    pub database_url: Option<String>,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    pub redis_url: Option<String>,

    /// JSON catalog file; absent means the built-in catalog
    pub catalog_path: Option<PathBuf>,

    // Refresh
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,
    #[serde(default = "default_coalesce_refreshes")]
    pub coalesce_refreshes: bool,

    // Fetch timeouts
    #[serde(default = "default_feed_timeout")]
    pub feed_timeout_secs: u64,
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    #[serde(default = "default_browser_timeout")]
    pub browser_timeout_secs: u64,
    #[serde(default = "default_selector_wait")]
    pub selector_wait_ms: u64,

    #[serde(default = "default_feed_user_agent")]
    pub feed_user_agent: String,
    #[serde(default = "default_browser_user_agent")]
    pub browser_user_agent: String,
    pub chrome_executable: Option<PathBuf>,

    // Cache lifetimes
    #[serde(default = "default_news_cache_ttl")]
    pub news_cache_ttl_secs: u64,
    #[serde(default = "default_catalog_cache_ttl")]
    pub catalog_cache_ttl_secs: u64,

    // Metrics
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_max_concurrent_fetches() -> usize {
    5
}

fn default_refresh_interval() -> String {
    "15m".to_string()
}

fn default_coalesce_refreshes() -> bool {
    true
}

fn default_feed_timeout() -> u64 {
    10
}

fn default_page_timeout() -> u64 {
    30
}

fn default_browser_timeout() -> u64 {
    60
}

fn default_selector_wait() -> u64 {
    5000
}

fn default_feed_user_agent() -> String {
    DEFAULT_FEED_USER_AGENT.to_string()
}

fn default_browser_user_agent() -> String {
    DEFAULT_BROWSER_USER_AGENT.to_string()
}

fn default_news_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_catalog_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("newshub").required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            anyhow::bail!("max_concurrent_fetches must be at least 1");
        }
        let every = self.refresh_interval()?;
        if every < Duration::from_secs(1) {
            anyhow::bail!("refresh_interval must be at least 1s, got {}", self.refresh_interval);
        }
        Ok(())
    }

    /// Scheduler period, parsed from a humantime string such as `15m`
    pub fn refresh_interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.refresh_interval)
            .with_context(|| format!("invalid refresh_interval {:?}", self.refresh_interval))
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_timeout_secs)
    }

    pub fn selector_wait(&self) -> Duration {
        Duration::from_millis(self.selector_wait_ms)
    }

    pub fn news_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.news_cache_ttl_secs)
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            feed_timeout: Duration::from_secs(self.feed_timeout_secs),
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            feed_user_agent: self.feed_user_agent.clone(),
            browser_user_agent: self.browser_user_agent.clone(),
            ..HttpClientConfig::default()
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_concurrent_fetches: self.max_concurrent_fetches,
            news_cache_ttl: self.news_cache_ttl(),
            catalog_cache_ttl: Duration::from_secs(self.catalog_cache_ttl_secs),
            coalesce_refreshes: self.coalesce_refreshes,
        }
    }
}
