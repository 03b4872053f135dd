//! Read-through cache
//!
//! Query results and the catalog snapshot are cached under rendered
//! [`CacheKey`]s. Keys are colon-separated tags, so a refresh of one source
//! can drop every cached query shape that mentions that source or its
//! language while leaving unrelated entries alone.
//!
//! The cache is an optimization only: callers treat every cache error as a
//! miss and go to the store.

pub mod memory;
pub mod redis_cache;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::catalog::CatalogSnapshot;
use crate::error::Result;
use crate::schemas::NewsItem;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

/// Placeholder for an unscoped segment
const ANY: &str = "*";

/// Structured form of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A news query; `None` scopes mean "all"
    News {
        source_id: Option<String>,
        language: Option<String>,
        limit: usize,
    },
    /// The full catalog snapshot
    AllSources,
}

impl CacheKey {
    pub fn news_by_source(source_id: &str, limit: usize) -> Self {
        Self::News {
            source_id: Some(source_id.to_string()),
            language: None,
            limit,
        }
    }

    pub fn news_by_language(language: &str, limit: usize) -> Self {
        Self::News {
            source_id: None,
            language: Some(language.to_string()),
            limit,
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::News {
                source_id,
                language,
                limit,
            } => write!(
                f,
                "news:{}:{}:{}",
                source_id.as_deref().unwrap_or(ANY),
                language.as_deref().unwrap_or(ANY),
                limit
            ),
            Self::AllSources => f.write_str("sources:all"),
        }
    }
}

/// True when a rendered news key is scoped to `source_id` or `language`
pub fn key_touches(key: &str, source_id: &str, language: &str) -> bool {
    let mut segments = key.split(':');
    if segments.next() != Some("news") {
        return false;
    }
    let source = segments.next();
    let lang = segments.next();
    source == Some(source_id) || lang == Some(language)
}

/// What a cache entry holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CachedValue {
    News(Vec<NewsItem>),
    Catalog(CatalogSnapshot),
}

/// Predicate over rendered keys used for bulk invalidation
pub type KeyPredicate<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

#[async_trait]
pub trait NewsCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedValue>>;

    /// Stores `value`; `None` uses the backend's default lifetime
    async fn set(&self, key: &str, value: CachedValue, ttl: Option<Duration>) -> Result<()>;

    /// Removes every entry whose key satisfies `predicate`; returns how many
    async fn invalidate(&self, predicate: KeyPredicate<'_>) -> Result<usize>;

    /// Removes everything
    async fn flush(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rendering() {
        assert_eq!(CacheKey::news_by_source("alpha", 20).render(), "news:alpha:*:20");
        assert_eq!(CacheKey::news_by_language("kn", 5).render(), "news:*:kn:5");
        assert_eq!(CacheKey::AllSources.render(), "sources:all");
    }

    #[test]
    fn test_key_touches_by_segment() {
        assert!(key_touches("news:alpha:*:20", "alpha", "en"));
        assert!(key_touches("news:*:en:10", "alpha", "en"));
        assert!(!key_touches("news:beta:*:20", "alpha", "en"));
        assert!(!key_touches("news:*:hi:10", "alpha", "en"));
        assert!(!key_touches("news:alphabet:*:20", "alpha", "en"));
        assert!(!key_touches("sources:all", "alpha", "en"));
    }
}
