//! Storage layer for normalized news items
//!
//! The store contract is a dedup-upsert keyed by `guid`: saving an item whose
//! guid already exists overwrites it with the fresher fields, except
//! `fetched_at`, which keeps the first-seen time. Items are
//! written independently, so one bad item never loses the rest of a batch.
//!
//! Backends:
//! - [`MemoryStore`]: in-process map, used for tests and DB-less runs
//! - [`PgStore`]: PostgreSQL via sqlx

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::{IngestionError, Result};
use crate::schemas::NewsItem;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of one `save` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Items inserted or overwritten
    pub upserted: usize,
    /// Items rejected or whose write failed
    pub failed: usize,
}

impl SaveReport {
    pub fn total(&self) -> usize {
        self.upserted + self.failed
    }
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Upserts every item by guid. Empty input is a no-op. `Err` means the
    /// batch never reached the store; per-item failures land in the report.
    async fn save(&self, items: &[NewsItem]) -> Result<SaveReport>;

    /// Newest first, at most `limit`
    async fn find_by_source(&self, source_id: &str, limit: usize) -> Result<Vec<NewsItem>>;

    /// Newest first, at most `limit`
    async fn find_by_language(&self, language: &str, limit: usize) -> Result<Vec<NewsItem>>;

    async fn count(&self) -> Result<usize>;
}

/// Rejects items the store could never key or query
pub fn check_item(item: &NewsItem) -> Result<()> {
    if item.guid.trim().is_empty() {
        return Err(IngestionError::ValidationError(format!(
            "item from {} has an empty guid",
            item.source_id
        )));
    }
    if item.source_id.is_empty() || item.language.is_empty() {
        return Err(IngestionError::ValidationError(format!(
            "item {} lacks provenance",
            item.guid
        )));
    }
    Ok(())
}
