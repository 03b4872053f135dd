//! Source fetching
//!
//! Every catalog source is retrieved through the [`SourceFetcher`] trait.
//! The production implementation is the [`StrategyChain`]:
//! - `feed` sources: HTTP fetch + syndication parse
//! - `scrape` sources: static fetch + selector extraction, falling back to a
//!   headless render when the static page yields nothing
//!
//! Fetching never fails outward: every transport, parse or selector problem
//! degrades to an empty [`FetchResult`].

pub mod browser;
pub mod chain;
pub mod extract;
pub mod feed;

use async_trait::async_trait;

use crate::catalog::SourceDescriptor;
use crate::schemas::RawRecord;

/// Which step of the chain produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOrigin {
    Feed,
    StaticPage,
    RenderedPage,
}

impl FetchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::StaticPage => "static",
            Self::RenderedPage => "rendered",
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Candidate records, not yet normalized
    pub records: Vec<RawRecord>,
    /// Set when `records` is non-empty
    pub origin: Option<FetchOrigin>,
}

impl FetchResult {
    /// Creates an empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a result with records; empty input stays an empty result
    pub fn with_records(records: Vec<RawRecord>, origin: FetchOrigin) -> Self {
        let origin = (!records.is_empty()).then_some(origin);
        Self { records, origin }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Trait for anything that can retrieve a catalog source
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Retrieves candidate records for `source`. Never errors; failures are
    /// logged and yield an empty result.
    async fn fetch(&self, source: &SourceDescriptor) -> FetchResult;
}

pub use browser::{PageRenderer, RenderOptions};
#[cfg(feature = "headless")]
pub use browser::ChromiumRenderer;
pub use chain::StrategyChain;
pub use extract::{Extractor, ScrapeRules, SelectorExtractor};
pub use feed::parse_feed;
