//! Redis-backed cache
//!
//! Values are stored as JSON under `<prefix><key>` with a server-side expiry.
//! Invalidation walks the prefix with SCAN and deletes matching keys, so
//! nothing outside the prefix is ever touched.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info};

use super::{CachedValue, KeyPredicate, NewsCache};
use crate::error::Result;

pub const DEFAULT_PREFIX: &str = "newshub:cache:";
const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: String,
    default_ttl: Duration,
}

impl RedisCache {
    pub async fn connect(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        info!("Connecting to Redis...");
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: DEFAULT_PREFIX.to_string(),
            default_ttl,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Every key under the prefix, with the prefix stripped
    async fn scan_keys(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string)),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(self.full_key(key));
        }
        let removed: usize = cmd.query_async(&mut conn).await?;
        Ok(removed)
    }
}

#[async_trait]
impl NewsCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: CachedValue, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let data = serde_json::to_string(&value)?;
        let ttl = ttl.unwrap_or(self.default_ttl).as_secs().max(1);

        redis::cmd("SET")
            .arg(self.full_key(key))
            .arg(&data)
            .arg("EX")
            .arg(ttl)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, predicate: KeyPredicate<'_>) -> Result<usize> {
        let matching: Vec<String> = self
            .scan_keys()
            .await?
            .into_iter()
            .filter(|key| predicate(key))
            .collect();
        let removed = self.delete(&matching).await?;
        debug!(removed = removed, "Cache entries invalidated");
        Ok(removed)
    }

    async fn flush(&self) -> Result<()> {
        let keys = self.scan_keys().await?;
        let removed = self.delete(&keys).await?;
        debug!(removed = removed, "Cache flushed");
        Ok(())
    }
}
