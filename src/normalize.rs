//! Normalizer
//!
//! Turns a [`RawRecord`] into the canonical [`NewsItem`]. Total: every field
//! is defaulted or sanitized on its own, so no input makes normalization
//! fail.
//!
//! Rich text keeps only `p`, `br`, `strong`, `em`, `a`, `ul`, `ol` and `li`;
//! anchors keep `href` and `target`. Script and style elements are removed
//! together with their content.

use ammonia::Builder;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};

use crate::dedup::derive_guid;
use crate::schemas::{NewsItem, RawRecord, UNTITLED};

const ALLOWED_TAGS: &[&str] = &["p", "br", "strong", "em", "a", "ul", "ol", "li"];
const ANCHOR_ATTRIBUTES: &[&str] = &["href", "target"];

static SANITIZER: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .tag_attributes(HashMap::from([("a", ANCHOR_ATTRIBUTES.iter().copied().collect())]))
        .generic_attributes(HashSet::new())
        .link_rel(None);
    builder
});

/// Strips everything outside the rich-text safelist
pub fn sanitize_html(input: &str) -> String {
    SANITIZER.clean(input).to_string().trim().to_string()
}

/// `src` of the first `<img>` in an HTML fragment
pub fn extract_image(html: &str) -> Option<String> {
    let selector = Selector::parse("img[src]").ok()?;
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Plain, single-line text; markup in titles is dropped
fn plain_text(input: &str) -> String {
    let text = if input.contains('<') {
        Html::parse_fragment(input).root_element().text().collect::<String>()
    } else {
        input.to_string()
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Normalizes with the current time as the ingestion timestamp
pub fn normalize(raw: RawRecord, source_id: &str, language: &str) -> NewsItem {
    normalize_at(raw, source_id, language, Utc::now())
}

pub fn normalize_at(raw: RawRecord, source_id: &str, language: &str, now: DateTime<Utc>) -> NewsItem {
    let title = raw
        .title
        .as_deref()
        .map(plain_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let link = raw.link.as_deref().map(str::trim).unwrap_or_default().to_string();
    let guid = derive_guid(raw.guid.as_deref(), &link, source_id, &title);

    let description_raw = non_empty(raw.description);
    let content_raw = non_empty(raw.content);

    let image_url = non_empty(raw.image_url)
        .map(|url| url.trim().to_string())
        .or_else(|| content_raw.as_deref().and_then(extract_image))
        .or_else(|| description_raw.as_deref().and_then(extract_image));

    let description = description_raw
        .as_deref()
        .or(content_raw.as_deref())
        .map(sanitize_html)
        .unwrap_or_default();
    let content = content_raw
        .as_deref()
        .or(description_raw.as_deref())
        .map(sanitize_html)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let categories = raw
        .categories
        .iter()
        .map(|c| plain_text(c))
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect();

    NewsItem {
        guid,
        source_id: source_id.to_string(),
        language: language.to_string(),
        title,
        description,
        content,
        link,
        published_at: raw.published_at.unwrap_or(now),
        fetched_at: now,
        author: raw.author.as_deref().map(plain_text).filter(|a| !a.is_empty()),
        categories,
        image_url,
    }
}
