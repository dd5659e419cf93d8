use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a per-source failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidFeedUrl,
    FetchError,
    ParseError,
    StorageError,
    SourceNotFound,
    DeadlineExceeded,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFeedUrl => "INVALID_FEED_URL",
            Self::FetchError => "FETCH_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::StorageError => "STORAGE_ERROR",
            Self::SourceNotFound => "SOURCE_NOT_FOUND",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a source that was crawled successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCrawlResult {
    pub source_id: i64,
    pub source_name: String,
    pub posts_saved: usize,
    /// Valid entries considered (after the per-feed cap)
    pub entries_found: usize,
    pub crawled_at: DateTime<Utc>,
}

/// A failure recorded for one source during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCrawlError {
    pub source_id: i64,
    pub source_name: String,
    pub message: String,
    pub kind: ErrorKind,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate of one crawl run
///
/// Built by the run tracker while the run is in progress and handed out by
/// value once the run has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlingResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_sources: usize,
    pub processed_sources: usize,
    pub posts_saved: usize,
    /// Successful sources in enumeration order
    pub source_results: Vec<SourceCrawlResult>,
    /// Failed sources in enumeration order
    pub errors: Vec<SourceCrawlError>,
}

impl CrawlingResult {
    /// True when the run produced new posts or recorded failures
    pub fn should_notify(&self) -> bool {
        self.posts_saved > 0 || !self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.finished_at - self.started_at
    }

    /// At least one source processed and nothing failed
    pub fn is_successful(&self) -> bool {
        self.processed_sources > 0 && self.errors.is_empty()
    }

    /// At least one source processed, but some failed
    pub fn is_partially_successful(&self) -> bool {
        self.processed_sources > 0 && !self.errors.is_empty()
    }

    pub fn failed_sources(&self) -> usize {
        self.errors.len()
    }
}
