//! Refresh status
//!
//! Refreshes are fire-and-forget from the caller's side, so their outcome is
//! observable here (and in logs/metrics) rather than through the handle.
//! One [`SourceStatus`] per source id, updated as refreshes start and finish.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Refresh history for a single source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub source_id: String,
    /// A refresh of this source is currently running
    pub running: bool,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Items persisted by the last successful refresh
    pub last_item_count: usize,
    /// Items persisted since process start
    pub total_items: u64,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Fetch step that produced the last successful batch
    pub last_origin: Option<String>,
}

impl SourceStatus {
    pub fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            ..Default::default()
        }
    }

    pub fn record_started(&mut self) {
        self.running = true;
        self.last_started_at = Some(Utc::now());
    }

    /// Records a successful refresh
    pub fn record_success(&mut self, item_count: usize, origin: Option<&str>) {
        self.running = false;
        self.last_completed_at = Some(Utc::now());
        self.last_item_count = item_count;
        self.total_items += item_count as u64;
        self.last_origin = origin.map(str::to_string);
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    /// Records a failed refresh
    pub fn record_failure(&mut self, error: &str) {
        self.running = false;
        self.last_completed_at = Some(Utc::now());
        self.last_error = Some(error.to_string());
        self.consecutive_failures += 1;
    }
}

/// Shared map of per-source status; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    sources: Arc<RwLock<HashMap<String, SourceStatus>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F: FnOnce(&mut SourceStatus)>(&self, source_id: &str, f: F) {
        let mut sources = self.sources.write();
        let status = sources
            .entry(source_id.to_string())
            .or_insert_with(|| SourceStatus::new(source_id));
        f(status);
    }

    pub fn started(&self, source_id: &str) {
        self.update(source_id, SourceStatus::record_started);
    }

    pub fn succeeded(&self, source_id: &str, item_count: usize, origin: Option<&str>) {
        self.update(source_id, |s| s.record_success(item_count, origin));
    }

    pub fn failed(&self, source_id: &str, error: &str) {
        self.update(source_id, |s| s.record_failure(error));
    }

    pub fn get(&self, source_id: &str) -> Option<SourceStatus> {
        self.sources.read().get(source_id).cloned()
    }

    /// All statuses, ordered by source id
    pub fn snapshot(&self) -> Vec<SourceStatus> {
        let mut all: Vec<_> = self.sources.read().values().cloned().collect();
        all.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        all
    }
}
