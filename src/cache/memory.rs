//! In-process TTL cache

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CachedValue, KeyPredicate, NewsCache};
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

/// Map of entries with per-entry expiry; expired entries are dropped lazily
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    default_ttl: Duration,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Live entry count
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NewsCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: CachedValue, ttl: Option<Duration>) -> Result<()> {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries
            .write()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn invalidate(&self, predicate: KeyPredicate<'_>) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        let removed = before - entries.len();
        debug!(removed = removed, "Cache entries invalidated");
        Ok(removed)
    }

    async fn flush(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}
