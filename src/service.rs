//! News service: refresh orchestration and cached reads
//!
//! Constructed once at startup with its collaborators injected:
//! - catalog (read-only), fetcher, store, cache
//! - one admission limiter shared by every refresh path (5 slots by default)
//! - an in-flight set that coalesces overlapping refreshes of one source
//! - a status board recording how each source's last refresh went
//!
//! Refresh entry points isolate per-source failures: a source that errors,
//! times out, yields nothing or panics is logged and counted, and the rest of
//! the batch carries on.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::cache::{key_touches, CacheKey, CachedValue, NewsCache};
use crate::catalog::{CatalogSnapshot, SourceCatalog, SourceDescriptor};
use crate::dedup::InFlightSet;
use crate::error::{IngestionError, Result};
use crate::metrics::{self, InFlightFetch, SCOPE_ALL, SCOPE_SOURCE};
use crate::normalize::normalize;
use crate::schemas::NewsItem;
use crate::sources::SourceFetcher;
use crate::status::{SourceStatus, StatusBoard};
use crate::storage::NewsStore;

/// Tunables for the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Simultaneous source refreshes across all entry points
    pub max_concurrent_fetches: usize,
    pub news_cache_ttl: Duration,
    pub catalog_cache_ttl: Duration,
    /// Skip a refresh when one for the same source is already running
    pub coalesce_refreshes: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 5,
            news_cache_ttl: Duration::from_secs(300),
            catalog_cache_ttl: Duration::from_secs(3600),
            coalesce_refreshes: true,
        }
    }
}

/// Totals for one refresh-all cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub sources: usize,
    /// Sources that persisted at least one item
    pub succeeded: usize,
    /// Sources that errored, panicked or retrieved nothing
    pub failed: usize,
    /// Sources skipped because a refresh was already running
    pub skipped: usize,
    pub items: usize,
}

/// How one source refresh ended, short of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceRefresh {
    Persisted(usize),
    Empty,
    Coalesced,
}

impl SourceRefresh {
    fn persisted(&self) -> usize {
        match self {
            Self::Persisted(n) => *n,
            _ => 0,
        }
    }
}

#[derive(Clone)]
pub struct NewsService {
    catalog: Arc<SourceCatalog>,
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<dyn NewsStore>,
    cache: Arc<dyn NewsCache>,
    limiter: Arc<Semaphore>,
    in_flight: InFlightSet,
    status: StatusBoard,
    config: ServiceConfig,
}

impl NewsService {
    pub fn new(
        catalog: Arc<SourceCatalog>,
        fetcher: Arc<dyn SourceFetcher>,
        store: Arc<dyn NewsStore>,
        cache: Arc<dyn NewsCache>,
        config: ServiceConfig,
    ) -> Self {
        let permits = config.max_concurrent_fetches.max(1);
        info!(
            sources = catalog.len(),
            max_concurrent_fetches = permits,
            coalesce = config.coalesce_refreshes,
            "News service initialized"
        );

        Self {
            catalog,
            fetcher,
            store,
            cache,
            limiter: Arc::new(Semaphore::new(permits)),
            in_flight: InFlightSet::new(),
            status: StatusBoard::new(),
            config,
        }
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    pub fn find_source_by_id(&self, source_id: &str) -> Option<&SourceDescriptor> {
        self.catalog.find(source_id)
    }

    pub fn refresh_status(&self, source_id: &str) -> Option<SourceStatus> {
        self.status.get(source_id)
    }

    pub fn statuses(&self) -> Vec<SourceStatus> {
        self.status.snapshot()
    }

    // ============================================
    // REFRESH
    // ============================================

    /// Refreshes one source and returns how many items were persisted.
    /// Unknown ids fail immediately; everything upstream of the store
    /// degrades to `Ok(0)`.
    #[instrument(skip(self), fields(correlation_id = %Uuid::new_v4()))]
    pub async fn refresh_source(&self, source_id: &str) -> Result<usize> {
        let source = self
            .find_source_by_id(source_id)
            .cloned()
            .ok_or_else(|| IngestionError::SourceNotFound(source_id.to_string()))?;

        let outcome = self.refresh_one(&source).await;
        metrics::record_refresh(
            SCOPE_SOURCE,
            matches!(outcome, Ok(SourceRefresh::Persisted(_))),
        );

        let refreshed = outcome?;
        if refreshed != SourceRefresh::Coalesced {
            self.invalidate_source(&source).await;
        }
        Ok(refreshed.persisted())
    }

    /// Refreshes every catalog source under the admission limit and waits
    /// for all of them to settle. Never fails; the cache is flushed at the
    /// end regardless of outcomes.
    #[instrument(skip(self), fields(correlation_id = %Uuid::new_v4()))]
    pub async fn refresh_all(&self) -> RefreshSummary {
        let sources: Vec<SourceDescriptor> = self.catalog.iter().cloned().collect();
        info!(
            sources = sources.len(),
            limit = self.config.max_concurrent_fetches,
            "Refreshing all sources"
        );

        let handles: Vec<(String, JoinHandle<Result<SourceRefresh>>)> = sources
            .into_iter()
            .map(|source| {
                let service = self.clone();
                let span = info_span!("source_refresh", source = %source.id);
                let id = source.id.clone();
                let handle = tokio::spawn(
                    async move { service.refresh_one(&source).await }.instrument(span),
                );
                (id, handle)
            })
            .collect();

        let mut summary = RefreshSummary {
            sources: handles.len(),
            ..Default::default()
        };

        for (source_id, handle) in handles {
            match handle.await {
                Ok(Ok(SourceRefresh::Persisted(n))) => {
                    summary.succeeded += 1;
                    summary.items += n;
                }
                Ok(Ok(SourceRefresh::Empty)) => summary.failed += 1,
                Ok(Ok(SourceRefresh::Coalesced)) => summary.skipped += 1,
                Ok(Err(e)) => {
                    warn!(source = %source_id, error = %e, "Source refresh failed");
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(source = %source_id, error = %e, "Source refresh task aborted");
                    self.status.failed(&source_id, "refresh task aborted");
                    summary.failed += 1;
                }
            }
        }

        self.flush_cache().await;
        metrics::record_refresh(SCOPE_ALL, summary.failed == 0);

        info!(
            sources = summary.sources,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            items = summary.items,
            "Refresh cycle completed"
        );
        summary
    }

    /// Starts a refresh of one source in the background. The id is checked
    /// up front so a bad id is reported to the caller, not just logged.
    pub fn spawn_refresh_source(&self, source_id: &str) -> Result<JoinHandle<Result<usize>>> {
        if self.find_source_by_id(source_id).is_none() {
            return Err(IngestionError::SourceNotFound(source_id.to_string()));
        }
        let service = self.clone();
        let source_id = source_id.to_string();
        Ok(tokio::spawn(async move { service.refresh_source(&source_id).await }))
    }

    /// Starts a refresh of every source in the background
    pub fn spawn_refresh_all(&self) -> JoinHandle<RefreshSummary> {
        let service = self.clone();
        tokio::spawn(async move { service.refresh_all().await })
    }

    /// Fetch, normalize and persist one source under a limiter slot
    async fn refresh_one(&self, source: &SourceDescriptor) -> Result<SourceRefresh> {
        let _claim = if self.config.coalesce_refreshes {
            match self.in_flight.try_claim(&source.id) {
                Some(claim) => Some(claim),
                None => {
                    info!(source = %source.id, "Refresh already running, skipping");
                    metrics::record_refresh_coalesced(&source.id);
                    return Ok(SourceRefresh::Coalesced);
                }
            }
        } else {
            None
        };

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| IngestionError::LimiterClosed)?;
        let _gauge = InFlightFetch::enter();
        self.status.started(&source.id);

        let fetched = self.fetcher.fetch(source).await;
        if fetched.is_empty() {
            warn!(
                source = %source.id,
                strategy = %source.strategy.as_str(),
                url = %source.feed_url,
                "Source retrieved no items"
            );
            self.status.failed(&source.id, "no items retrieved");
            return Ok(SourceRefresh::Empty);
        }

        let origin = fetched.origin.map(|o| o.as_str());
        let items: Vec<NewsItem> = fetched
            .records
            .into_iter()
            .map(|raw| normalize(raw, &source.id, &source.language))
            .collect();

        let report = match self.store.save(&items).await {
            Ok(report) => report,
            Err(e) => {
                error!(source = %source.id, items = items.len(), error = %e, "Failed to persist batch");
                self.status.failed(&source.id, &e.to_string());
                return Err(e);
            }
        };

        metrics::record_items_persisted(&source.id, report.upserted as u64);
        if report.failed > 0 {
            metrics::record_store_write_failures(&source.id, report.failed as u64);
        }
        self.status.succeeded(&source.id, report.upserted, origin);

        info!(
            source = %source.id,
            origin = origin.unwrap_or("none"),
            fetched = items.len(),
            persisted = report.upserted,
            failed = report.failed,
            "Source refreshed"
        );
        Ok(SourceRefresh::Persisted(report.upserted))
    }

    // ============================================
    // CACHE
    // ============================================

    /// Drops cached queries scoped to the source or its language
    async fn invalidate_source(&self, source: &SourceDescriptor) {
        let source_id = source.id.as_str();
        let language = source.language.as_str();
        let predicate = move |key: &str| key_touches(key, source_id, language);

        match self.cache.invalidate(&predicate).await {
            Ok(removed) => debug!(source = %source_id, removed = removed, "Cache invalidated"),
            Err(e) => warn!(source = %source_id, error = %e, "Cache invalidation failed"),
        }
    }

    async fn flush_cache(&self) {
        if let Err(e) = self.cache.flush().await {
            warn!(error = %e, "Cache flush failed");
        }
    }

    async fn cached(&self, key: &str) -> Option<CachedValue> {
        match self.cache.get(key).await {
            Ok(Some(value)) => Some(value),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling through");
                metrics::record_cache_error();
                None
            }
        }
    }

    async fn remember(&self, key: &str, value: CachedValue, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, Some(ttl)).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    async fn read_through<F, Fut>(&self, key: CacheKey, load: F) -> Result<Vec<NewsItem>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<NewsItem>>>,
    {
        let key = key.render();
        if let Some(CachedValue::News(items)) = self.cached(&key).await {
            metrics::record_cache_hit();
            debug!(key = %key, count = items.len(), "Cache hit");
            return Ok(items);
        }
        metrics::record_cache_miss();

        let items = load().await?;
        self.remember(&key, CachedValue::News(items.clone()), self.config.news_cache_ttl)
            .await;
        Ok(items)
    }

    // ============================================
    // QUERIES
    // ============================================

    /// Latest items for one source, newest first
    pub async fn get_cached_news(&self, source_id: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.read_through(CacheKey::news_by_source(source_id, limit), || {
            self.store.find_by_source(source_id, limit)
        })
        .await
    }

    /// Latest items across one language, newest first
    pub async fn get_news_by_language(&self, language: &str, limit: usize) -> Result<Vec<NewsItem>> {
        self.read_through(CacheKey::news_by_language(language, limit), || {
            self.store.find_by_language(language, limit)
        })
        .await
    }

    /// Catalog grouped by language, cached under the long-lived key
    pub async fn sources_snapshot(&self) -> CatalogSnapshot {
        let key = CacheKey::AllSources.render();
        if let Some(CachedValue::Catalog(snapshot)) = self.cached(&key).await {
            metrics::record_cache_hit();
            return snapshot;
        }
        metrics::record_cache_miss();

        let snapshot = self.catalog.snapshot();
        self.remember(&key, CachedValue::Catalog(snapshot.clone()), self.config.catalog_cache_ttl)
            .await;
        snapshot
    }
}
