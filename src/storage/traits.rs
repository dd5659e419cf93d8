//! Storage traits and error types
//!
//! The crawler depends only on these traits; `SqliteStorage` implements both.

use crate::model::{Post, Source};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an insert-if-absent on the normalized URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The post was new; carries the stored post with its assigned id
    Inserted(Post),
    /// A post with the same normalized URL already exists
    Duplicate,
}

/// Read access to the registered sources
#[cfg_attr(test, mockall::automock)]
pub trait SourceDirectory: Send + Sync {
    /// Lists sources with `ACTIVE` status, ordered by id
    fn list_active_sources(&self) -> StorageResult<Vec<Source>>;

    /// Gets a source by id regardless of status
    fn get_source(&self, id: i64) -> StorageResult<Option<Source>>;
}

/// Write access for newly discovered posts
#[cfg_attr(test, mockall::automock)]
pub trait PostStore: Send + Sync {
    /// Returns true if a post with this normalized URL is already stored
    fn exists_by_normalized_url(&self, normalized_url: &str) -> StorageResult<bool>;

    /// Inserts the post unless its normalized URL is already present
    ///
    /// Must be atomic with respect to concurrent callers: of two saves with the
    /// same normalized URL exactly one returns `Inserted`.
    fn save(&self, post: Post) -> StorageResult<SaveOutcome>;
}
