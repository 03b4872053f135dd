//! Fetch strategy chain
//!
//! `feed` sources: one feed download + parse.
//! `scrape` sources: static page + extraction; when that yields nothing and a
//! renderer is configured, a single headless render + the same extraction.
//!
//! Every failure is logged with source, strategy, url and upstream status,
//! then degrades to an empty result.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::browser::{PageRenderer, RenderOptions};
use super::extract::{Extractor, SelectorExtractor};
use super::feed::parse_feed;
use super::{FetchOrigin, FetchResult, SourceFetcher};
use crate::catalog::{FetchStrategy, SourceCatalog, SourceDescriptor};
use crate::error::{IngestionError, Result};
use crate::http_client::HttpFetcher;
use crate::metrics::{self, StepTimer, STEP_FEED, STEP_RENDERED, STEP_STATIC};
use crate::schemas::RawRecord;

pub struct StrategyChain {
    http: HttpFetcher,
    extractors: HashMap<String, Arc<dyn Extractor>>,
    renderer: Option<Arc<dyn PageRenderer>>,
    render_timeout: Duration,
    selector_wait: Duration,
}

impl StrategyChain {
    /// Builds a chain with an extractor for every rule set in the catalog and
    /// no headless fallback
    pub fn new(http: HttpFetcher, catalog: &SourceCatalog) -> Result<Self> {
        let mut extractors: HashMap<String, Arc<dyn Extractor>> = HashMap::new();
        for (key, rules) in catalog.scrape_rules() {
            extractors.insert(key.clone(), Arc::new(SelectorExtractor::new(rules.clone())?));
        }

        Ok(Self {
            http,
            extractors,
            renderer: None,
            render_timeout: RenderOptions::default().timeout,
            selector_wait: RenderOptions::default().selector_wait,
        })
    }

    /// Enables the headless fallback
    pub fn with_renderer(
        mut self,
        renderer: Arc<dyn PageRenderer>,
        render_timeout: Duration,
        selector_wait: Duration,
    ) -> Self {
        self.renderer = Some(renderer);
        self.render_timeout = render_timeout;
        self.selector_wait = selector_wait;
        self
    }

    /// Registers or replaces the extractor for a rule-set key
    pub fn with_extractor(mut self, key: impl Into<String>, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.insert(key.into(), extractor);
        self
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    async fn fetch_feed(&self, source: &SourceDescriptor) -> FetchResult {
        let outcome = {
            let _timer = StepTimer::new(STEP_FEED);
            match self.http.fetch_feed(&source.feed_url).await {
                Ok(body) => parse_feed(&body),
                Err(e) => Err(e),
            }
        };

        let result = match outcome {
            Ok(records) => {
                debug!(source = %source.id, count = records.len(), "Feed parsed");
                FetchResult::with_records(records, FetchOrigin::Feed)
            }
            Err(e) => {
                log_failure(source, STEP_FEED, &source.feed_url, &e);
                FetchResult::empty()
            }
        };

        metrics::record_fetch(&source.id, STEP_FEED, result.len());
        result
    }

    async fn fetch_scrape(&self, source: &SourceDescriptor) -> FetchResult {
        let Some(extractor) = self.extractors.get(source.scraper_key()) else {
            warn!(
                source = %source.id,
                scraper = %source.scraper_key(),
                "No extractor registered for scrape source"
            );
            metrics::record_fetch(&source.id, STEP_STATIC, 0);
            return FetchResult::empty();
        };

        let records = self.scrape_static(source, extractor.as_ref()).await;
        if !records.is_empty() {
            metrics::record_fetch(&source.id, STEP_STATIC, records.len());
            return FetchResult::with_records(records, FetchOrigin::StaticPage);
        }

        let Some(renderer) = &self.renderer else {
            info!(source = %source.id, "Static scrape empty and no renderer configured");
            metrics::record_fetch(&source.id, STEP_STATIC, 0);
            return FetchResult::empty();
        };

        info!(source = %source.id, url = %source.feed_url, "Static scrape empty, falling back to headless render");
        metrics::record_browser_fallback(&source.id);

        let records = self.scrape_rendered(source, extractor.as_ref(), renderer.as_ref()).await;
        metrics::record_fetch(&source.id, STEP_RENDERED, records.len());
        FetchResult::with_records(records, FetchOrigin::RenderedPage)
    }

    async fn scrape_static(&self, source: &SourceDescriptor, extractor: &dyn Extractor) -> Vec<RawRecord> {
        let _timer = StepTimer::new(STEP_STATIC);
        match self.http.fetch_page(&source.feed_url).await {
            Ok(markup) => {
                let records = extractor.extract(&markup);
                debug!(source = %source.id, count = records.len(), "Static page extracted");
                records
            }
            Err(e) => {
                log_failure(source, STEP_STATIC, &source.feed_url, &e);
                Vec::new()
            }
        }
    }

    async fn scrape_rendered(
        &self,
        source: &SourceDescriptor,
        extractor: &dyn Extractor,
        renderer: &dyn PageRenderer,
    ) -> Vec<RawRecord> {
        let _timer = StepTimer::new(STEP_RENDERED);
        let options = RenderOptions {
            timeout: self.render_timeout,
            wait_for_selector: extractor.wait_for_selector().map(str::to_string),
            selector_wait: self.selector_wait,
        };

        match renderer.render(&source.feed_url, &options).await {
            Ok(markup) => {
                let records = extractor.extract(&markup);
                if records.is_empty() {
                    warn!(source = %source.id, url = %source.feed_url, "Rendered page yielded no items");
                }
                records
            }
            Err(e) => {
                log_failure(source, STEP_RENDERED, &source.feed_url, &e);
                Vec::new()
            }
        }
    }
}

fn log_failure(source: &SourceDescriptor, step: &str, url: &str, error: &IngestionError) {
    warn!(
        source = %source.id,
        strategy = %source.strategy.as_str(),
        step = step,
        url = %url,
        status = ?error.upstream_status(),
        error = %error,
        "Fetch step failed"
    );
}

#[async_trait]
impl SourceFetcher for StrategyChain {
    #[instrument(skip(self, source), fields(source = %source.id, strategy = %source.strategy.as_str()))]
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult {
        match source.strategy {
            FetchStrategy::Feed => self.fetch_feed(source).await,
            FetchStrategy::Scrape => self.fetch_scrape(source).await,
        }
    }
}
