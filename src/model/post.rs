use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A canonical post, created once per unique normalized URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Assigned by storage on insert
    pub id: Option<i64>,
    pub source_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub original_url: String,
    /// Deduplication key
    pub normalized_url: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Assigned by storage on insert
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
