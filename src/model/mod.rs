//! Domain records flowing through the ingestion pipeline
//!
//! - `Source`: a blog whose feed is crawled (owned by the source directory)
//! - `RawFeed` / `FeedEntry`: fetched bytes and the validated entries parsed from them
//! - `Post`: the canonical, deduplicated record persisted per unique normalized URL
//! - `CrawlingResult`: the per-run aggregate handed to completion listeners

mod entry;
mod post;
mod result;
mod source;

pub use entry::{
    clean_text, is_valid_entry_url, truncate_content, FeedEntry, RawFeed, MAX_CONTENT_LENGTH,
    MAX_TITLE_LENGTH,
};
pub use post::Post;
pub use result::{CrawlingResult, ErrorKind, SourceCrawlError, SourceCrawlResult};
pub use source::{Source, SourceStatus};
