//! Deduplication Module
//!
//! Two kinds of dedup live here:
//! - item identity: the `guid` every stored [`NewsItem`](crate::schemas::NewsItem)
//!   is keyed by (upstream id, else canonical link, else a content hash)
//! - refresh coalescing: an in-flight set so overlapping refreshes of the
//!   same source do not fetch twice

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Query parameters that never change which article a link points to
const TRACKING_PARAMS: &[&str] = &[
    "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
    "fbclid", "gclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_gl", "yclid",
    "twclid", "ref", "ref_src",
];

/// Computes SHA-256 hash of content
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalizes URL to canonical form
/// - Removes fragments (#...)
/// - Removes tracking parameters (utm_*, fbclid, etc.)
/// - Sorts the remaining query parameters
///
/// Scheme and host come back lowercased from the parser; the path keeps its
/// case since many CMSes route case-sensitively.
pub fn canonicalize_url(url_str: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(url_str.trim())?;
    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    if !params.is_empty() {
        params.sort();
        url.query_pairs_mut().extend_pairs(params);
    }

    Ok(url.to_string())
}

/// Derives the dedup key for an item
///
/// Explicit upstream identifier wins; otherwise the canonical link; when
/// both are missing the key hashes source and title so the item stays
/// addressable.
pub fn derive_guid(explicit: Option<&str>, link: &str, source_id: &str, title: &str) -> String {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let link = link.trim();
    if !link.is_empty() {
        return canonicalize_url(link).unwrap_or_else(|_| link.to_string());
    }

    format!("sha256:{}", compute_hash(&format!("{}|{}", source_id, title.trim())))
}

/// Set of source ids with a refresh currently running
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    running: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `source_id`; `None` when a refresh for it is already running.
    /// The claim is released when the returned guard drops.
    pub fn try_claim(&self, source_id: &str) -> Option<InFlightGuard> {
        let mut running = self.running.lock();
        if !running.insert(source_id.to_string()) {
            debug!(source = %source_id, "Refresh already in flight");
            return None;
        }
        Some(InFlightGuard {
            running: self.running.clone(),
            source_id: source_id.to_string(),
        })
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.running.lock().contains(source_id)
    }

    pub fn len(&self) -> usize {
        self.running.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.lock().is_empty()
    }
}

/// Releases an in-flight claim on drop
#[derive(Debug)]
pub struct InFlightGuard {
    running: Arc<Mutex<HashSet<String>>>,
    source_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.running.lock().remove(&self.source_id);
    }
}
