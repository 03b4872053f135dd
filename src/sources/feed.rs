//! Syndication feed parsing
//!
//! RSS 0.9x/1.0/2.0, Atom and JSON Feed are all handled by `feed-rs`. Entries
//! become [`RawRecord`]s with whatever metadata the feed carried; defaults
//! are left to the normalizer.

use feed_rs::model::Entry;
use feed_rs::parser;

use crate::error::{IngestionError, Result};
use crate::schemas::RawRecord;

/// Parses a feed document into raw records, in document order
pub fn parse_feed(raw: &[u8]) -> Result<Vec<RawRecord>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestionError::FeedParse("feed payload is empty".to_string()));
    }

    // feed-rs synthesizes ids for entries without one; an empty id lets the
    // normalizer fall back to the canonical link instead
    let feed = parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
        .parse(raw)
        .map_err(|e| IngestionError::FeedParse(e.to_string()))?;

    Ok(feed.entries.iter().map(record_from_entry).collect())
}

fn record_from_entry(entry: &Entry) -> RawRecord {
    let guid = Some(entry.id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let title = entry.title.as_ref().map(|text| text.content.clone());
    let link = select_entry_link(entry);
    let description = entry.summary.as_ref().map(|text| text.content.clone());
    let content = entry.content.as_ref().and_then(|content| content.body.clone());
    let author = entry
        .authors
        .first()
        .map(|person| person.name.trim().to_string())
        .filter(|name| !name.is_empty());
    let categories = entry
        .categories
        .iter()
        .map(|category| category.label.clone().unwrap_or_else(|| category.term.clone()))
        .filter(|label| !label.trim().is_empty())
        .collect();

    RawRecord {
        title,
        link,
        description,
        content,
        published_at: entry.published.or(entry.updated),
        guid,
        author,
        categories,
        image_url: select_entry_image(entry),
    }
}

/// First alternate (or unlabeled) link, else any link at all
fn select_entry_link(entry: &Entry) -> Option<String> {
    let non_empty = || entry.links.iter().filter(|link| !link.href.trim().is_empty());

    non_empty()
        .find(|link| {
            link.rel
                .as_deref()
                .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .or_else(|| non_empty().next())
        .map(|link| link.href.trim().to_string())
}

/// Enclosure-style image: media content first, then thumbnails
fn select_entry_image(entry: &Entry) -> Option<String> {
    let content_image = entry.media.iter().flat_map(|media| media.content.iter()).find_map(|content| {
        let is_image = content
            .content_type
            .as_ref()
            .map_or(true, |mime| mime.to_string().starts_with("image/"));
        content.url.as_ref().filter(|_| is_image).map(|url| url.to_string())
    });

    content_image.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|media| media.thumbnails.iter())
            .map(|thumbnail| thumbnail.image.uri.trim())
            .find(|uri| !uri.is_empty())
            .map(str::to_string)
    })
}
