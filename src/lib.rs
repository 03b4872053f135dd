//! NewsHub ingestion core
//!
//! Pulls articles from a catalog of multi-language news sources and keeps a
//! deduplicated store of them fresh.
//!
//! Features:
//! - Source catalog grouped by language, loaded from JSON and validated
//! - Fetch strategy chain: feed, then static scrape, then headless render
//! - Normalization with HTML sanitization and stable guids
//! - Dedup-upsert persistence (Postgres or in-memory)
//! - Refresh orchestration with bounded concurrency and failure isolation
//! - Read-through cache (Redis or in-memory) with scoped invalidation
//! - Prometheus metrics per source and fetch step

pub mod cache;
pub mod catalog;
pub mod config;
pub mod dedup;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod normalize;
pub mod scheduler;
pub mod schemas;
pub mod service;
pub mod sources;
pub mod status;
pub mod storage;

pub use catalog::{SourceCatalog, SourceDescriptor};
pub use error::{IngestionError, Result};
pub use schemas::{NewsItem, RawRecord};
pub use service::{NewsService, RefreshSummary, ServiceConfig};
