//! Source Catalog
//!
//! Static, ordered mapping `language -> [SourceDescriptor]` plus the
//! versioned selector rule sets used by scrape sources. Loaded once at
//! startup and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};
use validator::Validate;

use crate::error::{IngestionError, Result};
use crate::sources::extract::{ScrapeRules, SelectorExtractor};

/// Catalog shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../catalog/sources.json");

/// How a source is retrieved
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Syndication feed (RSS, Atom, JSON Feed)
    #[default]
    #[serde(alias = "rss")]
    Feed,
    /// Static HTML scrape with headless fallback
    #[serde(alias = "scraper")]
    Scrape,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Scrape => "scrape",
        }
    }
}

/// Immutable description of one upstream
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[validate(length(min = 1))]
    pub language: String,
    #[validate(url)]
    pub feed_url: String,
    #[serde(default)]
    pub strategy: FetchStrategy,
    /// Rule-set key for scrape sources; defaults to the source id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraper: Option<String>,
}

impl SourceDescriptor {
    pub fn feed(id: &str, language: &str, feed_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            language: language.to_string(),
            feed_url: feed_url.to_string(),
            strategy: FetchStrategy::Feed,
            scraper: None,
        }
    }

    pub fn scrape(id: &str, language: &str, page_url: &str) -> Self {
        Self {
            strategy: FetchStrategy::Scrape,
            ..Self::feed(id, language, page_url)
        }
    }

    /// Key of the selector rule set this source extracts with
    pub fn scraper_key(&self) -> &str {
        self.scraper.as_deref().unwrap_or(&self.id)
    }
}

/// Display metadata for a language tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub native_name: String,
}

/// One language and its sources, in catalog order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageGroup {
    #[serde(flatten)]
    pub language: LanguageInfo,
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
}

/// Serializable view of the catalog, cached under the "all sources" key
pub type CatalogSnapshot = Vec<LanguageGroup>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    languages: Vec<LanguageGroup>,
    #[serde(default)]
    scrapers: BTreeMap<String, ScrapeRules>,
}

#[derive(Debug, Clone)]
pub struct SourceCatalog {
    groups: Vec<LanguageGroup>,
    scrapers: BTreeMap<String, ScrapeRules>,
}

/// Ids end up as segments of colon-separated cache keys
fn check_key_segment(kind: &str, id: &str) -> Result<()> {
    if id.contains(':') {
        return Err(IngestionError::ValidationError(format!(
            "{kind} id {id:?} must not contain ':'"
        )));
    }
    Ok(())
}

impl SourceCatalog {
    /// Builds and validates a catalog
    pub fn new(groups: Vec<LanguageGroup>, scrapers: BTreeMap<String, ScrapeRules>) -> Result<Self> {
        let catalog = Self { groups, scrapers };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog bundled with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.languages, file.scrapers)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            languages = catalog.groups.len(),
            sources = catalog.len(),
            "Source catalog loaded"
        );
        Ok(catalog)
    }

    /// Checks descriptors, id uniqueness and that every scrape source has a
    /// compilable rule set
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            check_key_segment("language", &group.language.id)?;
            for source in &group.sources {
                check_key_segment("source", &source.id)?;
                source
                    .validate()
                    .map_err(|e| IngestionError::ValidationError(format!("source {}: {}", source.id, e)))?;
                if source.language != group.language.id {
                    return Err(IngestionError::ValidationError(format!(
                        "source {} declares language {} but is listed under {}",
                        source.id, source.language, group.language.id
                    )));
                }
                if !seen.insert(source.id.as_str()) {
                    return Err(IngestionError::ValidationError(format!(
                        "duplicate source id: {}",
                        source.id
                    )));
                }
                if source.strategy == FetchStrategy::Scrape
                    && !self.scrapers.contains_key(source.scraper_key())
                {
                    return Err(IngestionError::ValidationError(format!(
                        "scrape source {} has no rule set {}",
                        source.id,
                        source.scraper_key()
                    )));
                }
            }
        }

        for (key, rules) in &self.scrapers {
            SelectorExtractor::new(rules.clone())
                .map_err(|e| IngestionError::ValidationError(format!("rule set {}: {}", key, e)))?;
        }

        debug!(sources = seen.len(), rule_sets = self.scrapers.len(), "Catalog validated");
        Ok(())
    }

    pub fn find(&self, source_id: &str) -> Option<&SourceDescriptor> {
        self.iter().find(|s| s.id == source_id)
    }

    /// Every source across every language, in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.groups.iter().flat_map(|g| g.sources.iter())
    }

    pub fn sources_for(&self, language: &str) -> &[SourceDescriptor] {
        self.groups
            .iter()
            .find(|g| g.language.id == language)
            .map(|g| g.sources.as_slice())
            .unwrap_or(&[])
    }

    pub fn languages(&self) -> impl Iterator<Item = &LanguageInfo> {
        self.groups.iter().map(|g| &g.language)
    }

    pub fn scrape_rules(&self) -> &BTreeMap<String, ScrapeRules> {
        &self.scrapers
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.groups.clone()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.sources.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
