//! Entry-to-post conversion

use crate::model::{truncate_content, FeedEntry, Post, Source};
use crate::url::normalize_url;
use chrono::{DateTime, Utc};

/// Converts a validated entry of `source` into an unsaved post
///
/// Entries without a publication date are stamped with `now`.
pub fn to_post(entry: &FeedEntry, source: &Source, now: DateTime<Utc>) -> Post {
    Post {
        id: None,
        source_id: source.id,
        title: entry.title.trim().to_string(),
        content: entry.body.as_deref().map(truncate_content),
        original_url: entry.url.clone(),
        normalized_url: normalize_url(&entry.url),
        author: entry.author.clone(),
        published_at: entry.published_at.unwrap_or(now),
        created_at: None,
    }
}
