use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

/// Maximum number of characters in a valid entry title
pub const MAX_TITLE_LENGTH: usize = 500;

/// Maximum number of characters kept from an entry body
pub const MAX_CONTENT_LENGTH: usize = 2000;

const TRUNCATION_MARKER: &str = "...";

const ENTRY_URL_PATTERN: &str = r"^https?://[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+$";

/// Bytes retrieved for one fetch attempt
#[derive(Debug, Clone)]
pub struct RawFeed {
    /// URL the bytes were actually requested from (may be a proxy URL)
    pub fetched_url: String,
    pub bytes: Vec<u8>,
}

impl RawFeed {
    pub fn new(fetched_url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            fetched_url: fetched_url.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A single feed item after text cleanup
///
/// Entries are validated once at the parse boundary; the rest of the pipeline
/// only ever sees entries for which `is_valid()` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedEntry {
    pub fn has_valid_title(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && title.chars().count() <= MAX_TITLE_LENGTH
    }

    pub fn has_valid_url(&self) -> bool {
        is_valid_entry_url(&self.url)
    }

    pub fn is_valid(&self) -> bool {
        self.has_valid_title() && self.has_valid_url()
    }
}

/// Checks an entry link against the accepted absolute HTTP(S) URL shape
pub fn is_valid_entry_url(url: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(ENTRY_URL_PATTERN).expect("entry URL pattern compiles"))
        .is_match(url)
}

/// Strips markup from feed text
///
/// Tags are removed, entities decoded, and runs of whitespace collapsed to a
/// single space.
pub fn clean_text(input: &str) -> String {
    if !input.contains('<') && !input.contains('&') {
        return collapse_whitespace(input);
    }

    let fragment = Html::parse_fragment(input);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caps a body at `MAX_CONTENT_LENGTH` characters
///
/// Longer text keeps its first `MAX_CONTENT_LENGTH - 3` characters followed by
/// `"..."`, so the result is exactly `MAX_CONTENT_LENGTH` characters long and
/// truncating again leaves it unchanged.
pub fn truncate_content(text: &str) -> String {
    if text.chars().count() <= MAX_CONTENT_LENGTH {
        return text.to_string();
    }

    let keep = MAX_CONTENT_LENGTH - TRUNCATION_MARKER.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
