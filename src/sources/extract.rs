//! Selector-based extraction
//!
//! Each scrape site is described by a versioned [`ScrapeRules`] set loaded
//! from the catalog. Rules compile into a [`SelectorExtractor`], which turns
//! markup (static or browser-rendered) into raw records. Transport never
//! reaches this module, so extraction is testable on fixture HTML alone.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::error::{IngestionError, Result};
use crate::schemas::RawRecord;

/// Uniform extraction capability: markup in, candidate records out
pub trait Extractor: Send + Sync {
    fn extract(&self, markup: &str) -> Vec<RawRecord>;

    /// Selector a rendered page should show before its markup is captured
    fn wait_for_selector(&self) -> Option<&str> {
        None
    }
}

/// Selector configuration for one site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRules {
    /// Bumped whenever the site's layout forces a selector change
    #[serde(default = "default_version")]
    pub version: u32,
    /// Origin relative links are resolved against
    pub base_url: String,
    /// One match per candidate story
    pub item_selector: String,
    /// Anchor inside the item carrying href and (by default) the title
    pub link_selector: String,
    /// Anchors matching this are never used as the story link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_exclude_selector: Option<String>,
    /// Headline inside the link; falls back to the link text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,
    /// Candidates whose title contains any of these are navigation, not news
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_titles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
}

fn default_version() -> u32 {
    1
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| IngestionError::Selector(format!("{selector}: {e}")))
}

/// Compiled form of a [`ScrapeRules`] set
#[derive(Debug)]
pub struct SelectorExtractor {
    rules: ScrapeRules,
    base: Url,
    item: Selector,
    link: Selector,
    link_exclude: Option<Selector>,
    title: Option<Selector>,
    description: Option<Selector>,
}

impl SelectorExtractor {
    pub fn new(rules: ScrapeRules) -> Result<Self> {
        let base = Url::parse(&rules.base_url)
            .map_err(|e| IngestionError::ValidationError(format!("base url {}: {}", rules.base_url, e)))?;

        Ok(Self {
            base,
            item: compile(&rules.item_selector)?,
            link: compile(&rules.link_selector)?,
            link_exclude: rules.link_exclude_selector.as_deref().map(compile).transpose()?,
            title: rules.title_selector.as_deref().map(compile).transpose()?,
            description: rules.description_selector.as_deref().map(compile).transpose()?,
            rules,
        })
    }

    pub fn rules(&self) -> &ScrapeRules {
        &self.rules
    }

    fn story_link<'a>(&self, item: ElementRef<'a>) -> Option<ElementRef<'a>> {
        item.select(&self.link).find(|anchor| {
            self.link_exclude
                .as_ref()
                .map_or(true, |exclude| !exclude.matches(anchor))
        })
    }

    fn candidate(&self, item: ElementRef<'_>) -> Option<RawRecord> {
        let anchor = self.story_link(item)?;

        let title = self
            .title
            .as_ref()
            .and_then(|sel| anchor.select(sel).next())
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| element_text(anchor));
        if title.is_empty() {
            return None;
        }
        if self.rules.excluded_titles.iter().any(|label| title.contains(label.as_str())) {
            return None;
        }

        let href = anchor.value().attr("href")?.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        let link = self.base.join(href).ok()?;

        let mut record = RawRecord::scraped(title, link.to_string());
        if let Some(description) = self
            .description
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .map(element_text)
            .filter(|d| !d.is_empty())
        {
            record.description = Some(description);
        }
        Some(record)
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, markup: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(markup);
        let mut seen = HashSet::new();

        let records: Vec<RawRecord> = document
            .select(&self.item)
            .filter_map(|item| self.candidate(item))
            .filter(|record| seen.insert(record.link.clone()))
            .collect();

        debug!(
            base = %self.base,
            version = self.rules.version,
            count = records.len(),
            "Extracted candidates"
        );
        records
    }

    fn wait_for_selector(&self) -> Option<&str> {
        self.rules.wait_for_selector.as_deref()
    }
}

/// Text content with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
