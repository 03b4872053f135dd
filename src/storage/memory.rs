//! In-memory news store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{check_item, NewsStore, SaveReport};
use crate::error::Result;
use crate::schemas::NewsItem;

/// Guid-keyed map behind a lock; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<RwLock<HashMap<String, NewsItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guid: &str) -> Option<NewsItem> {
        self.items.read().get(guid).cloned()
    }

    fn query<F>(&self, limit: usize, filter: F) -> Vec<NewsItem>
    where
        F: Fn(&NewsItem) -> bool,
    {
        let mut matched: Vec<NewsItem> = self
            .items
            .read()
            .values()
            .filter(|item| filter(item))
            .cloned()
            .collect();
        matched.sort_by(NewsItem::recency_cmp);
        matched.truncate(limit);
        matched
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn save(&self, items: &[NewsItem]) -> Result<SaveReport> {
        let mut report = SaveReport::default();
        if items.is_empty() {
            return Ok(report);
        }

        let mut map = self.items.write();
        for item in items {
            match check_item(item) {
                Ok(()) => {
                    let mut stored = item.clone();
                    if let Some(existing) = map.get(&item.guid) {
                        stored.fetched_at = existing.fetched_at;
                    }
                    map.insert(item.guid.clone(), stored);
                    report.upserted += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping item");
                    report.failed += 1;
                }
            }
        }

        debug!(upserted = report.upserted, failed = report.failed, "Memory store saved batch");
        Ok(report)
    }

    async fn find_by_source(&self, source_id: &str, limit: usize) -> Result<Vec<NewsItem>> {
        Ok(self.query(limit, |item| item.source_id == source_id))
    }

    async fn find_by_language(&self, language: &str, limit: usize) -> Result<Vec<NewsItem>> {
        Ok(self.query(limit, |item| item.language == language))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.items.read().len())
    }
}
