//! Prometheus Metrics for the ingestion core
//!
//! Metrics include:
//! - refresh outcomes per scope (single source / all sources)
//! - fetch outcomes per source and producing step
//! - fetch latency per step (histogram)
//! - in-flight fetch gauge (bounded by the refresh limiter)
//! - headless fallbacks, persisted items, store write failures
//! - cache hit/miss counts

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use tracing::{error, info};

// ============================================
// METRIC DEFINITIONS
// ============================================

/// Steps of the fetch chain, used as the `step` label
pub const STEP_FEED: &str = "feed";
pub const STEP_STATIC: &str = "static";
pub const STEP_RENDERED: &str = "rendered";

pub const SCOPE_SOURCE: &str = "source";
pub const SCOPE_ALL: &str = "all";

static REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_refreshes_total",
        "Completed refreshes by scope and outcome",
        &["scope", "outcome"]
    ).expect("Failed to create refreshes metric")
});

static SOURCE_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_source_fetches_total",
        "Source fetches by producing step and outcome",
        &["source", "step", "outcome"]
    ).expect("Failed to create source_fetches metric")
});

static FETCH_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0];
    register_histogram_vec!(
        HistogramOpts::new(
            "newshub_fetch_latency_seconds",
            "Latency of each fetch step in seconds"
        ).buckets(buckets),
        &["step"]
    ).expect("Failed to create fetch_latency metric")
});

static FETCHES_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "newshub_fetches_in_flight",
        "Source refreshes currently holding a limiter slot"
    ).expect("Failed to create fetches_in_flight metric")
});

static BROWSER_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_browser_fallbacks_total",
        "Headless renders triggered after an empty static scrape",
        &["source"]
    ).expect("Failed to create browser_fallbacks metric")
});

static ITEMS_PERSISTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_items_persisted_total",
        "Items upserted into the store",
        &["source"]
    ).expect("Failed to create items_persisted metric")
});

static STORE_WRITE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_store_write_failures_total",
        "Items whose upsert failed",
        &["source"]
    ).expect("Failed to create store_write_failures metric")
});

static CACHE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_cache_requests_total",
        "Read-through cache lookups by result",
        &["result"]
    ).expect("Failed to create cache_requests metric")
});

static REFRESHES_COALESCED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newshub_refreshes_coalesced_total",
        "Refresh requests skipped because one was already running",
        &["source"]
    ).expect("Failed to create refreshes_coalesced metric")
});

// ============================================
// METRICS API
// ============================================

pub fn record_refresh(scope: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    REFRESHES.with_label_values(&[scope, outcome]).inc();
}

/// Records a finished fetch; `step` is the step that produced items, or the
/// last step attempted when nothing came back
pub fn record_fetch(source: &str, step: &str, items: usize) {
    let outcome = if items > 0 { "items" } else { "empty" };
    SOURCE_FETCHES.with_label_values(&[source, step, outcome]).inc();
}

pub fn record_fetch_latency(step: &str, latency_secs: f64) {
    FETCH_LATENCY.with_label_values(&[step]).observe(latency_secs);
}

pub fn record_browser_fallback(source: &str) {
    BROWSER_FALLBACKS.with_label_values(&[source]).inc();
}

pub fn record_items_persisted(source: &str, count: u64) {
    ITEMS_PERSISTED.with_label_values(&[source]).inc_by(count);
}

pub fn record_store_write_failures(source: &str, count: u64) {
    STORE_WRITE_FAILURES.with_label_values(&[source]).inc_by(count);
}

pub fn record_cache_hit() {
    CACHE_REQUESTS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_REQUESTS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_error() {
    CACHE_REQUESTS.with_label_values(&["error"]).inc();
}

pub fn record_refresh_coalesced(source: &str) {
    REFRESHES_COALESCED.with_label_values(&[source]).inc();
}

// ============================================
// METRICS COLLECTION
// ============================================

/// Collects all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// A timer for measuring fetch step latency
pub struct StepTimer {
    step: &'static str,
    start: std::time::Instant,
}

impl StepTimer {
    pub fn new(step: &'static str) -> Self {
        Self {
            step,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for StepTimer {
    fn drop(&mut self) {
        record_fetch_latency(self.step, self.start.elapsed().as_secs_f64());
    }
}

/// Holds one unit of the in-flight gauge for its lifetime
pub struct InFlightFetch(());

impl InFlightFetch {
    pub fn enter() -> Self {
        FETCHES_IN_FLIGHT.inc();
        Self(())
    }
}

impl Drop for InFlightFetch {
    fn drop(&mut self) {
        FETCHES_IN_FLIGHT.dec();
    }
}

// ============================================
// METRICS SERVER
// ============================================

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Handles metrics HTTP requests
async fn handle_metrics(_req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let metrics = gather_metrics();
    Ok(Response::new(Full::new(Bytes::from(metrics))))
}

/// Starts the metrics HTTP server
pub async fn start_metrics_server(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "Metrics server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_metrics))
                .await
            {
                error!(error = %e, "Error serving metrics connection");
            }
        });
    }
}
