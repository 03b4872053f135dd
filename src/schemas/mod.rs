//! Shared schemas for the ingestion core
//!
//! All structs use `serde(rename_all = "camelCase")` so stored and cached
//! payloads match the JSON the serving layer already emits.

pub mod news_item;
pub mod raw_record;

pub use news_item::*;
pub use raw_record::*;

/// Title used when upstream supplies none
pub const UNTITLED: &str = "No Title";
