//! Integration tests for the ingestion core
//!
//! Uses wiremock for upstream feeds and pages, stub fetchers/renderers for
//! timing-sensitive cases, and the in-memory store and cache throughout.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newshub_ingestion::cache::{CachedValue, KeyPredicate, MemoryCache, NewsCache};
use newshub_ingestion::catalog::{LanguageGroup, LanguageInfo};
use newshub_ingestion::http_client::HttpFetcher;
use newshub_ingestion::sources::{
    FetchOrigin, FetchResult, PageRenderer, RenderOptions, SourceFetcher, StrategyChain,
};
use newshub_ingestion::storage::{MemoryStore, NewsStore, SaveReport};
use newshub_ingestion::{
    IngestionError, NewsItem, NewsService, RawRecord, ServiceConfig, SourceCatalog,
    SourceDescriptor,
};

// ============================================
// FIXTURES
// ============================================

/// RSS document with one item per `(guid, title, hour)`; `hour` is the
/// publication hour on 15 Jan 2024
fn rss(items: &[(&str, &str, u32)]) -> String {
    let body: String = items
        .iter()
        .map(|(guid, title, hour)| {
            format!(
                "<item><title>{title}</title><link>https://news.example/{guid}</link>\
                 <guid isPermaLink=\"false\">{guid}</guid>\
                 <description>About {title}</description>\
                 <pubDate>Mon, 15 Jan 2024 {hour:02}:00:00 GMT</pubDate></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><rss version=\"2.0\"><channel>\
         <title>Fixture</title><link>https://news.example/</link>\
         <description>Fixture feed</description>{body}</channel></rss>"
    )
}

async fn mount_feed(server: &MockServer, route: &str, xml: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(xml),
        )
        .mount(server)
        .await;
}

fn english() -> LanguageInfo {
    LanguageInfo {
        id: "en".to_string(),
        name: "English".to_string(),
        native_name: "English".to_string(),
    }
}

fn single_language_catalog(sources: Vec<SourceDescriptor>) -> SourceCatalog {
    SourceCatalog::new(
        vec![LanguageGroup {
            language: english(),
            sources,
        }],
        BTreeMap::new(),
    )
    .unwrap()
}

fn service_with(
    catalog: SourceCatalog,
    fetcher: Arc<dyn SourceFetcher>,
) -> (NewsService, MemoryStore, MemoryCache) {
    let store = MemoryStore::new();
    let cache = MemoryCache::new(Duration::from_secs(300));
    let service = NewsService::new(
        Arc::new(catalog),
        fetcher,
        Arc::new(store.clone()),
        Arc::new(cache.clone()),
        ServiceConfig::default(),
    );
    (service, store, cache)
}

fn http_service(catalog: SourceCatalog) -> (NewsService, MemoryStore, MemoryCache) {
    let http = HttpFetcher::with_defaults().unwrap();
    let chain = StrategyChain::new(http, &catalog).unwrap();
    service_with(catalog, Arc::new(chain))
}

/// Serves whatever records are currently registered for a source id
#[derive(Default)]
struct ScriptedFetcher {
    records: Mutex<HashMap<String, Vec<RawRecord>>>,
}

impl ScriptedFetcher {
    fn set(&self, source_id: &str, records: Vec<RawRecord>) {
        self.records.lock().insert(source_id.to_string(), records);
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult {
        let records = self.records.lock().get(&source.id).cloned().unwrap_or_default();
        FetchResult::with_records(records, FetchOrigin::Feed)
    }
}

fn story(source_id: &str, n: usize) -> RawRecord {
    RawRecord::scraped(
        format!("{source_id} story {n}"),
        format!("https://{source_id}.example/{n}"),
    )
    .guid(format!("{source_id}-{n}"))
}

// ============================================
// PERSISTENCE THROUGH THE FEED PATH
// ============================================

#[tokio::test]
async fn test_feed_refresh_is_idempotent() {
    let server = MockServer::start().await;
    mount_feed(&server, "/feed", rss(&[("g1", "First", 8), ("g2", "Second", 9)])).await;

    let catalog = single_language_catalog(vec![SourceDescriptor::feed(
        "s1",
        "en",
        &format!("{}/feed", server.uri()),
    )]);
    let (service, store, _) = http_service(catalog);

    assert_eq!(service.refresh_source("s1").await.unwrap(), 2);
    let first = store.get("g1").unwrap();

    assert_eq!(service.refresh_source("s1").await.unwrap(), 2);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.get("g1").unwrap(), first);
}

#[tokio::test]
async fn test_feed_update_overwrites_and_adds() {
    let server = MockServer::start().await;
    mount_feed(&server, "/feed", rss(&[("g1", "First", 8), ("g2", "Second", 9)])).await;

    let catalog = single_language_catalog(vec![SourceDescriptor::feed(
        "s1",
        "en",
        &format!("{}/feed", server.uri()),
    )]);
    let (service, store, _) = http_service(catalog);

    service.refresh_source("s1").await.unwrap();
    assert_eq!(store.get("g1").unwrap().title, "First");

    server.reset().await;
    mount_feed(&server, "/feed", rss(&[("g1", "First (updated)", 8), ("g3", "Third", 11)])).await;

    assert_eq!(service.refresh_source("s1").await.unwrap(), 2);
    assert_eq!(store.count().await.unwrap(), 3);
    assert_eq!(store.get("g1").unwrap().title, "First (updated)");
    assert!(store.get("g2").is_some());
    assert_eq!(store.get("g3").unwrap().source_id, "s1");

    let newest: Vec<_> = store
        .find_by_source("s1", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.guid)
        .collect();
    assert_eq!(newest, vec!["g3", "g2", "g1"]);

    let capped = service.get_cached_news("s1", 2).await.unwrap();
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].guid, "g3");
    assert!(capped[0].published_at > capped[1].published_at);
}

#[tokio::test]
async fn test_upstream_error_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = single_language_catalog(vec![SourceDescriptor::feed(
        "s1",
        "en",
        &format!("{}/feed", server.uri()),
    )]);
    let (service, store, _) = http_service(catalog);

    assert_eq!(service.refresh_source("s1").await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 0);
    let status = service.refresh_status("s1").unwrap();
    assert_eq!(status.consecutive_failures, 1);
    assert!(!status.running);
}

#[tokio::test]
async fn test_feed_markup_is_sanitized() {
    let server = MockServer::start().await;
    let xml = "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>F</title>\
        <link>https://news.example/</link><description>F</description>\
        <item><title>Risky</title><link>https://news.example/risky</link>\
        <guid isPermaLink=\"false\">risky</guid>\
        <description><![CDATA[<p onclick=\"steal()\">Hello <script>alert(1)</script>\
        <a href=\"https://news.example/more\" style=\"color:red\">more</a></p>]]></description>\
        </item></channel></rss>"
        .to_string();
    mount_feed(&server, "/feed", xml).await;

    let catalog = single_language_catalog(vec![SourceDescriptor::feed(
        "s1",
        "en",
        &format!("{}/feed", server.uri()),
    )]);
    let (service, store, _) = http_service(catalog);
    service.refresh_source("s1").await.unwrap();

    let item = store.get("risky").unwrap();
    assert!(item.description.contains("<p>"));
    assert!(item.description.contains("Hello"));
    assert!(item.description.contains("href=\"https://news.example/more\""));
    assert!(!item.description.contains("script"));
    assert!(!item.description.contains("alert"));
    assert!(!item.description.contains("onclick"));
    assert!(!item.description.contains("style"));
}

// ============================================
// SCRAPE CHAIN
// ============================================

struct CountingRenderer {
    markup: String,
    calls: AtomicUsize,
}

#[async_trait]
impl PageRenderer for CountingRenderer {
    async fn render(&self, _url: &str, _options: &RenderOptions) -> newshub_ingestion::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.markup.clone())
    }
}

const CARDS: &str = r#"<html><body>
  <div class="card"><a href="/world/one">World story one</a><p>Lead one</p></div>
  <div class="card"><a href="/world/two">World story two</a><p>Lead two</p></div>
</body></html>"#;

fn scrape_service(page_url: &str, renderer: Arc<CountingRenderer>) -> (NewsService, MemoryStore) {
    let catalog = SourceCatalog::from_json_str(
        &json!({
            "languages": [{
                "id": "kn",
                "name": "Kannada",
                "nativeName": "ಕನ್ನಡ",
                "sources": [{
                    "id": "site",
                    "name": "Site",
                    "language": "kn",
                    "feedUrl": page_url,
                    "strategy": "scrape"
                }]
            }],
            "scrapers": {
                "site": {
                    "baseUrl": "https://site.example/",
                    "itemSelector": "div.card",
                    "linkSelector": "a",
                    "descriptionSelector": "p",
                    "waitForSelector": "div.card"
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let http = HttpFetcher::with_defaults().unwrap();
    let chain = StrategyChain::new(http, &catalog).unwrap().with_renderer(
        renderer,
        Duration::from_secs(5),
        Duration::from_millis(100),
    );
    let (service, store, _) = service_with(catalog, Arc::new(chain));
    (service, store)
}

#[tokio::test]
async fn test_static_scrape_never_launches_renderer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CARDS))
        .mount(&server)
        .await;

    let renderer = Arc::new(CountingRenderer {
        markup: String::new(),
        calls: AtomicUsize::new(0),
    });
    let (service, store) = scrape_service(&format!("{}/", server.uri()), renderer.clone());

    assert_eq!(service.refresh_source("site").await.unwrap(), 2);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        service.refresh_status("site").unwrap().last_origin.as_deref(),
        Some("static")
    );

    let item = store.get("https://site.example/world/one").unwrap();
    assert_eq!(item.title, "World story one");
    assert_eq!(item.language, "kn");
}

#[tokio::test]
async fn test_blocked_scrape_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let renderer = Arc::new(CountingRenderer {
        markup: CARDS.to_string(),
        calls: AtomicUsize::new(0),
    });
    let (service, store) = scrape_service(&format!("{}/", server.uri()), renderer.clone());

    assert_eq!(service.refresh_source("site").await.unwrap(), 2);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(
        service.refresh_status("site").unwrap().last_origin.as_deref(),
        Some("rendered")
    );
}

#[tokio::test]
async fn test_selector_drift_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div id="app">Loading...</div><noscript>Enable JavaScript</noscript></body></html>"#,
        ))
        .mount(&server)
        .await;

    let renderer = Arc::new(CountingRenderer {
        markup: CARDS.to_string(),
        calls: AtomicUsize::new(0),
    });
    let (service, store) = scrape_service(&format!("{}/", server.uri()), renderer.clone());

    assert_eq!(service.refresh_source("site").await.unwrap(), 2);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert!(store.get("https://site.example/world/two").is_some());
}

// ============================================
// ORCHESTRATION
// ============================================

/// Slow fetcher that tracks how many fetches overlap
#[derive(Default)]
struct PeakFetcher {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl SourceFetcher for PeakFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        FetchResult::with_records(vec![story(&source.id, 1)], FetchOrigin::Feed)
    }
}

fn numbered_sources(n: usize) -> Vec<SourceDescriptor> {
    (0..n)
        .map(|i| {
            let id = format!("s{i:02}");
            SourceDescriptor::feed(&id, "en", &format!("https://{id}.example/feed"))
        })
        .collect()
}

#[tokio::test]
async fn test_refresh_all_respects_concurrency_limit() {
    let fetcher = Arc::new(PeakFetcher::default());
    let (service, store, _) = service_with(single_language_catalog(numbered_sources(20)), fetcher.clone());

    let summary = service.refresh_all().await;

    assert_eq!(summary.sources, 20);
    assert_eq!(summary.succeeded, 20);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 20);
    assert_eq!(store.count().await.unwrap(), 20);
    let peak = fetcher.peak.load(Ordering::SeqCst);
    assert!(peak <= 5, "peak concurrency was {peak}");
    assert!(peak >= 2, "fetches never overlapped");
}

/// Returns nothing for one source and panics for another
struct FlakyFetcher;

#[async_trait]
impl SourceFetcher for FlakyFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult {
        match source.id.as_str() {
            "s07" => FetchResult::empty(),
            "s13" => panic!("parser blew up"),
            id => FetchResult::with_records(vec![story(id, 1), story(id, 2)], FetchOrigin::Feed),
        }
    }
}

#[tokio::test]
async fn test_refresh_all_isolates_failures() {
    let (service, store, _) = service_with(single_language_catalog(numbered_sources(20)), Arc::new(FlakyFetcher));

    let summary = service.refresh_all().await;

    assert_eq!(summary.succeeded, 18);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.items, 36);
    assert_eq!(store.count().await.unwrap(), 36);
    assert!(store.find_by_source("s07", 10).await.unwrap().is_empty());
    assert_eq!(store.find_by_source("s19", 10).await.unwrap().len(), 2);
    assert!(service.refresh_status("s13").unwrap().last_error.is_some());

    // A later cycle still runs every source
    let again = service.refresh_all().await;
    assert_eq!(again.sources, 20);
}

/// Rejects every batch from one source, delegates the rest
struct BrokenSourceStore {
    inner: MemoryStore,
    broken: &'static str,
}

#[async_trait]
impl NewsStore for BrokenSourceStore {
    async fn save(&self, items: &[NewsItem]) -> newshub_ingestion::Result<SaveReport> {
        if items.iter().any(|item| item.source_id == self.broken) {
            return Err(IngestionError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        self.inner.save(items).await
    }

    async fn find_by_source(&self, source_id: &str, limit: usize) -> newshub_ingestion::Result<Vec<NewsItem>> {
        self.inner.find_by_source(source_id, limit).await
    }

    async fn find_by_language(&self, language: &str, limit: usize) -> newshub_ingestion::Result<Vec<NewsItem>> {
        self.inner.find_by_language(language, limit).await
    }

    async fn count(&self) -> newshub_ingestion::Result<usize> {
        self.inner.count().await
    }
}

#[tokio::test]
async fn test_store_failure_is_isolated() {
    let inner = MemoryStore::new();
    let fetcher = Arc::new(ScriptedFetcher::default());
    for id in ["s00", "s01", "s02"] {
        fetcher.set(id, vec![story(id, 1)]);
    }
    let service = NewsService::new(
        Arc::new(single_language_catalog(numbered_sources(3))),
        fetcher,
        Arc::new(BrokenSourceStore {
            inner: inner.clone(),
            broken: "s01",
        }),
        Arc::new(MemoryCache::new(Duration::from_secs(300))),
        ServiceConfig::default(),
    );

    let summary = service.refresh_all().await;
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(inner.count().await.unwrap(), 2);
    assert!(inner.get("s01-1").is_none());

    let status = service.refresh_status("s01").unwrap();
    assert!(status.last_error.is_some());
    assert_eq!(status.consecutive_failures, 1);

    assert!(matches!(
        service.refresh_source("s01").await,
        Err(IngestionError::DatabaseError(_))
    ));
    assert_eq!(service.refresh_source("s02").await.unwrap(), 1);
}

#[tokio::test]
async fn test_overlapping_refresh_is_coalesced() {
    let fetcher = Arc::new(PeakFetcher::default());
    let (service, _, _) = service_with(single_language_catalog(numbered_sources(1)), fetcher.clone());

    let (first, second) = tokio::join!(service.refresh_source("s00"), service.refresh_source("s00"));

    let mut counts = vec![first.unwrap(), second.unwrap()];
    counts.sort_unstable();
    assert_eq!(counts, vec![0, 1]);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_source_rejected() {
    let (service, _, _) = service_with(single_language_catalog(numbered_sources(1)), Arc::new(FlakyFetcher));
    let err = service.refresh_source("missing").await.unwrap_err();
    assert!(matches!(err, IngestionError::SourceNotFound(id) if id == "missing"));
}

// ============================================
// CACHE
// ============================================

#[tokio::test]
async fn test_refresh_invalidates_only_related_keys() {
    let catalog = SourceCatalog::new(
        vec![
            LanguageGroup {
                language: english(),
                sources: vec![SourceDescriptor::feed("alpha", "en", "https://alpha.example/feed")],
            },
            LanguageGroup {
                language: LanguageInfo {
                    id: "hi".to_string(),
                    name: "Hindi".to_string(),
                    native_name: "हिन्दी".to_string(),
                },
                sources: vec![SourceDescriptor::feed("beta", "hi", "https://beta.example/feed")],
            },
        ],
        BTreeMap::new(),
    )
    .unwrap();
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set("alpha", vec![story("alpha", 1)]);
    fetcher.set("beta", vec![story("beta", 1)]);
    let (service, store, cache) = service_with(catalog, fetcher.clone());

    service.refresh_source("alpha").await.unwrap();
    service.refresh_source("beta").await.unwrap();

    // Prime every query shape
    assert_eq!(service.get_cached_news("alpha", 10).await.unwrap().len(), 1);
    assert_eq!(service.get_news_by_language("en", 10).await.unwrap().len(), 1);
    assert_eq!(service.get_cached_news("beta", 10).await.unwrap().len(), 1);
    assert_eq!(service.get_news_by_language("hi", 10).await.unwrap().len(), 1);
    service.sources_snapshot().await;

    // New data for both, but only alpha is refreshed
    fetcher.set("alpha", vec![story("alpha", 1), story("alpha", 2)]);
    let extra = service.get_cached_news("beta", 10).await.unwrap()[0].clone();
    store
        .save(&[NewsItem {
            guid: "beta-2".to_string(),
            ..extra
        }])
        .await
        .unwrap();

    service.refresh_source("alpha").await.unwrap();

    assert_eq!(service.get_cached_news("alpha", 10).await.unwrap().len(), 2);
    assert_eq!(service.get_news_by_language("en", 10).await.unwrap().len(), 2);
    // Unrelated entries are still served from cache
    assert_eq!(service.get_cached_news("beta", 10).await.unwrap().len(), 1);
    assert_eq!(service.get_news_by_language("hi", 10).await.unwrap().len(), 1);
    assert!(cache.get("sources:all").await.unwrap().is_some());
}

/// Cache backend that is down for every operation
struct UnreachableCache;

fn cache_down() -> IngestionError {
    IngestionError::RedisError(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl NewsCache for UnreachableCache {
    async fn get(&self, _key: &str) -> newshub_ingestion::Result<Option<CachedValue>> {
        Err(cache_down())
    }

    async fn set(&self, _key: &str, _value: CachedValue, _ttl: Option<Duration>) -> newshub_ingestion::Result<()> {
        Err(cache_down())
    }

    async fn invalidate(&self, _predicate: KeyPredicate<'_>) -> newshub_ingestion::Result<usize> {
        Err(cache_down())
    }

    async fn flush(&self) -> newshub_ingestion::Result<()> {
        Err(cache_down())
    }
}

#[tokio::test]
async fn test_cache_outage_falls_through_to_store() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(ScriptedFetcher::default());
    fetcher.set("s00", vec![story("s00", 1), story("s00", 2)]);
    let service = NewsService::new(
        Arc::new(single_language_catalog(numbered_sources(1))),
        fetcher.clone(),
        Arc::new(store.clone()),
        Arc::new(UnreachableCache),
        ServiceConfig::default(),
    );

    assert_eq!(service.refresh_source("s00").await.unwrap(), 2);
    assert_eq!(service.get_cached_news("s00", 10).await.unwrap().len(), 2);
    assert_eq!(service.get_news_by_language("en", 10).await.unwrap().len(), 2);
    assert_eq!(service.sources_snapshot().await.len(), 1);

    fetcher.set("s00", vec![story("s00", 1), story("s00", 2), story("s00", 3)]);
    let summary = service.refresh_all().await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(service.get_cached_news("s00", 10).await.unwrap().len(), 3);
}

// ============================================
// CATALOG
// ============================================

#[test]
fn test_catalog_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let doc = json!({
        "languages": [{
            "id": "te",
            "name": "Telugu",
            "nativeName": "తెలుగు",
            "sources": [
                {"id": "eenadu", "name": "Eenadu", "language": "te", "feedUrl": "https://eenadu.example/rss", "strategy": "rss"},
                {"id": "sakshi", "name": "Sakshi", "language": "te", "feedUrl": "https://sakshi.example/", "strategy": "scraper"}
            ]
        }],
        "scrapers": {
            "sakshi": {"baseUrl": "https://sakshi.example/", "itemSelector": "article", "linkSelector": "a"}
        }
    });
    file.write_all(doc.to_string().as_bytes()).unwrap();

    let catalog = SourceCatalog::load(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.sources_for("te").len(), 2);
    assert!(catalog.sources_for("xx").is_empty());
    assert_eq!(catalog.find("sakshi").unwrap().strategy.as_str(), "scrape");
    assert!(catalog.find("nope").is_none());
}

#[test]
fn test_catalog_rejects_scrape_source_without_rules() {
    let doc = json!({
        "languages": [{
            "id": "te",
            "name": "Telugu",
            "sources": [
                {"id": "sakshi", "language": "te", "feedUrl": "https://sakshi.example/", "strategy": "scrape"}
            ]
        }]
    });
    assert!(matches!(
        SourceCatalog::from_json_str(&doc.to_string()),
        Err(IngestionError::ValidationError(_))
    ));
}

#[test]
fn test_builtin_catalog_is_valid() {
    let catalog = SourceCatalog::builtin().unwrap();
    assert!(!catalog.is_empty());
    assert!(catalog.languages().count() > 1);
}
