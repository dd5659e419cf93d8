//! SQLite storage implementation

use crate::model::{CrawlingResult, Post, Source, SourceStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    PostStore, SaveOutcome, SourceDirectory, StorageError, StorageResult,
};
use crate::storage::RunRecord;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SOURCE_COLUMNS: &str = "id, name, feed_url, site_url, status";

const POST_COLUMNS: &str = "id, source_id, title, content, original_url, normalized_url, author, published_at, created_at";

/// SQLite storage backend
///
/// The connection is shared behind a mutex so the storage can be handed to
/// concurrent crawl workers as `Arc<dyn PostStore>`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and initializes the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Inserts a source, or updates name, site URL and status of the source
    /// with the same feed URL
    pub fn upsert_source(
        &self,
        name: &str,
        feed_url: &str,
        site_url: Option<&str>,
        status: SourceStatus,
    ) -> StorageResult<Source> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sources (name, feed_url, site_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(feed_url) DO UPDATE SET
                 name = excluded.name,
                 site_url = excluded.site_url,
                 status = excluded.status",
            params![name, feed_url, site_url, status.to_db_string(), Utc::now()],
        )?;

        let source = conn.query_row(
            &format!("SELECT {} FROM sources WHERE feed_url = ?1", SOURCE_COLUMNS),
            params![feed_url],
            row_to_source,
        )?;
        Ok(source)
    }

    /// Lists every source regardless of status, ordered by id
    pub fn list_sources(&self) -> StorageResult<Vec<Source>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sources ORDER BY id",
            SOURCE_COLUMNS
        ))?;
        let sources = stmt
            .query_map([], row_to_source)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    pub fn count_sources_by_status(&self) -> StorageResult<HashMap<SourceStatus, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM sources GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = SourceStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }

    pub fn count_posts(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_posts_for_source(&self, source_id: i64) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Most recently published posts first
    pub fn latest_posts(&self, limit: usize) -> StorageResult<Vec<Post>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY published_at DESC, id DESC LIMIT ?1",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![limit as i64], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    pub fn get_post_by_normalized_url(&self, normalized_url: &str) -> StorageResult<Option<Post>> {
        let conn = self.conn()?;
        let post = conn
            .query_row(
                &format!(
                    "SELECT {} FROM posts WHERE normalized_url = ?1",
                    POST_COLUMNS
                ),
                params![normalized_url],
                row_to_post,
            )
            .optional()?;
        Ok(post)
    }

    /// Appends a completed run to the run history
    pub fn record_run(&self, result: &CrawlingResult) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO crawl_runs
                 (started_at, finished_at, total_sources, processed_sources, posts_saved, error_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.started_at,
                result.finished_at,
                result.total_sources as i64,
                result.processed_sources as i64,
                result.posts_saved as i64,
                result.errors.len() as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, started_at, finished_at, total_sources, processed_sources, posts_saved, error_count
                 FROM crawl_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        total_sources: row.get::<_, i64>(3)? as usize,
                        processed_sources: row.get::<_, i64>(4)? as usize,
                        posts_saved: row.get::<_, i64>(5)? as usize,
                        error_count: row.get::<_, i64>(6)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}

impl SourceDirectory for SqliteStorage {
    fn list_active_sources(&self) -> StorageResult<Vec<Source>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sources WHERE status = ?1 ORDER BY id",
            SOURCE_COLUMNS
        ))?;
        let sources = stmt
            .query_map(params![SourceStatus::Active.to_db_string()], row_to_source)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    fn get_source(&self, id: i64) -> StorageResult<Option<Source>> {
        let conn = self.conn()?;
        let source = conn
            .query_row(
                &format!("SELECT {} FROM sources WHERE id = ?1", SOURCE_COLUMNS),
                params![id],
                row_to_source,
            )
            .optional()?;
        Ok(source)
    }
}

impl PostStore for SqliteStorage {
    fn exists_by_normalized_url(&self, normalized_url: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE normalized_url = ?1)",
            params![normalized_url],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn save(&self, post: Post) -> StorageResult<SaveOutcome> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO posts
                 (source_id, title, content, original_url, normalized_url, author, published_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(normalized_url) DO NOTHING",
            params![
                post.source_id,
                post.title,
                post.content,
                post.original_url,
                post.normalized_url,
                post.author,
                post.published_at,
                created_at,
            ],
        )?;

        if inserted == 0 {
            return Ok(SaveOutcome::Duplicate);
        }

        Ok(SaveOutcome::Inserted(Post {
            id: Some(conn.last_insert_rowid()),
            created_at: Some(created_at),
            ..post
        }))
    }
}

fn row_to_source(row: &Row<'_>) -> rusqlite::Result<Source> {
    let status: String = row.get(4)?;
    let status = SourceStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown source status '{}'", status).into(),
        )
    })?;

    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        feed_url: row.get(2)?,
        site_url: row.get(3)?,
        status,
    })
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        source_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        original_url: row.get(4)?,
        normalized_url: row.get(5)?,
        author: row.get(6)?,
        published_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}
