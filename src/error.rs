//! Error types for the ingestion core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid data: {0}")]
    ValidationError(String),

    #[error("Refresh limiter closed")]
    LimiterClosed,
}

impl IngestionError {
    /// Upstream HTTP status carried by this error, if any
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;
