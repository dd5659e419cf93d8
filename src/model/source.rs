use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a source; only active sources are crawled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Active,
    Inactive,
    Suspended,
}

impl SourceStatus {
    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "SUSPENDED" => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Active, Self::Inactive, Self::Suspended]
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A blog registered in the source directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
    pub site_url: Option<String>,
    pub status: SourceStatus,
}

impl Source {
    pub fn is_active(&self) -> bool {
        self.status == SourceStatus::Active
    }

    /// Returns true if the feed URL is non-blank and uses an HTTP(S) scheme
    pub fn has_valid_feed_url(&self) -> bool {
        let url = self.feed_url.trim();
        !url.is_empty() && (url.starts_with("http://") || url.starts_with("https://"))
    }
}
