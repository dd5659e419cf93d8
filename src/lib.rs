//! Blogroll: a tech-blog RSS ingestion pipeline
//!
//! This crate fetches feeds from a directory of technical blogs, validates and
//! normalizes their entries into deduplicated posts, and tells listeners when a
//! crawl run has produced something worth reporting.

pub mod clock;
pub mod config;
pub mod crawler;
pub mod model;
pub mod notify;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] crawler::FetchError),

    #[error(transparent)]
    Parse(#[from] crawler::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Source {0} does not exist or is not active")]
    SourceNotFound(i64),

    #[error("Invalid feed URL for source {source_id}: '{url}'")]
    InvalidFeedUrl { source_id: i64, url: String },

    #[error("Run deadline exceeded before source {source_id} finished")]
    DeadlineExceeded { source_id: i64 },

    #[error("Crawl worker for source {source_id} stopped unexpectedly")]
    WorkerFailed { source_id: i64 },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl CrawlError {
    /// Classification recorded alongside per-source failures
    pub fn kind(&self) -> model::ErrorKind {
        use model::ErrorKind;

        match self {
            CrawlError::Fetch(_) | CrawlError::Reqwest(_) => ErrorKind::FetchError,
            CrawlError::Parse(_) => ErrorKind::ParseError,
            CrawlError::InvalidFeedUrl { .. } => ErrorKind::InvalidFeedUrl,
            CrawlError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            CrawlError::Storage(_) => ErrorKind::StorageError,
            CrawlError::SourceNotFound(_) => ErrorKind::SourceNotFound,
            _ => ErrorKind::Internal,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use model::{CrawlingResult, FeedEntry, Post, Source, SourceStatus};
pub use state::RunState;
pub use url::normalize_url;
