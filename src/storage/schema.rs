//! Database schema definitions

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Blogs whose feeds are crawled
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    feed_url TEXT NOT NULL UNIQUE,
    site_url TEXT,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sources_status ON sources(status);

-- One row per unique normalized URL
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id),
    title TEXT NOT NULL,
    content TEXT,
    original_url TEXT NOT NULL,
    normalized_url TEXT NOT NULL UNIQUE,
    author TEXT,
    published_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_source ON posts(source_id);
CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published_at);

-- Completed crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    total_sources INTEGER NOT NULL,
    processed_sources INTEGER NOT NULL,
    posts_saved INTEGER NOT NULL,
    error_count INTEGER NOT NULL
);
"#;

/// Initializes the database schema
///
/// Every statement is `IF NOT EXISTS`, so this is safe to run on an existing
/// database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
