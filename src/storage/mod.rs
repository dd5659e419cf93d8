//! Storage module for sources and posts
//!
//! This module handles all database operations for the pipeline:
//! - SQLite database initialization and schema management
//! - The source directory read by the crawler
//! - Post persistence with insert-if-absent deduplication
//! - A history of completed runs for reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PostStore, SaveOutcome, SourceDirectory, StorageError, StorageResult};

#[cfg(test)]
pub use traits::{MockPostStore, MockSourceDirectory};

use crate::config::SourceEntry;
use crate::model::Source;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Upserts every configured source, keyed by feed URL
///
/// Sources removed from the configuration are left untouched.
pub fn seed_sources(storage: &SqliteStorage, entries: &[SourceEntry]) -> StorageResult<Vec<Source>> {
    let mut seeded = Vec::with_capacity(entries.len());
    for entry in entries {
        let source = storage.upsert_source(
            entry.name.trim(),
            entry.feed_url.trim(),
            entry.site_url.as_deref(),
            entry.status,
        )?;
        tracing::debug!("Seeded source '{}' (#{})", source.name, source.id);
        seeded.push(source);
    }
    Ok(seeded)
}

/// A completed run as recorded in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_sources: usize,
    pub processed_sources: usize,
    pub posts_saved: usize,
    pub error_count: usize,
}
