//! NewsItem Schema
//!
//! The canonical, persisted form of one news article. Created and updated
//! only by the store's upsert; read-only everywhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Dedup identity: upstream id, else the canonical link
    pub guid: String,

    // Provenance
    pub source_id: String,
    pub language: String,

    // Content (description/content are sanitized HTML)
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    pub link: String,

    pub published_at: DateTime<Utc>,
    /// First time this guid was ingested; re-fetches leave it unchanged
    pub fetched_at: DateTime<Utc>,

    // Enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewsItem {
    /// Ordering used by every query path: newest first, guid as tie-break
    pub fn recency_cmp(a: &NewsItem, b: &NewsItem) -> std::cmp::Ordering {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.guid.cmp(&b.guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(guid: &str, hour: u32) -> NewsItem {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap();
        NewsItem {
            guid: guid.to_string(),
            source_id: "s1".to_string(),
            language: "en".to_string(),
            title: "Title".to_string(),
            description: String::new(),
            content: String::new(),
            link: format!("https://example.com/{guid}"),
            published_at: at,
            fetched_at: at,
            author: None,
            categories: vec![],
            image_url: None,
        }
    }

    #[test]
    fn test_camel_case_serialization() {
        let json = serde_json::to_string(&item("g1", 10)).unwrap();

        assert!(json.contains("sourceId"));
        assert!(json.contains("publishedAt"));
        assert!(!json.contains("imageUrl"));

        let parsed: NewsItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item("g1", 10));
    }

    #[test]
    fn test_recency_ordering() {
        let mut items = vec![item("a", 8), item("b", 12), item("c", 10)];
        items.sort_by(NewsItem::recency_cmp);

        let guids: Vec<_> = items.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec!["b", "c", "a"]);
    }
}
