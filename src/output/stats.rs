//! Statistics generation from the posts database
//!
//! This module provides functionality for extracting and displaying
//! source, post and run statistics from the storage layer.

use crate::model::{Post, SourceStatus};
use crate::storage::{RunRecord, SqliteStorage, StorageResult};
use std::collections::HashMap;

/// Number of recent posts shown by `print_statistics`
const LATEST_POSTS: usize = 10;

/// Storage statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of sources in the directory
    pub total_sources: u64,

    /// Count of sources by status
    pub sources_by_status: HashMap<SourceStatus, u64>,

    /// Total number of stored posts
    pub total_posts: u64,

    /// Most recently published posts
    pub latest_posts: Vec<Post>,

    /// The last recorded run, if any
    pub last_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<CrawlStatistics> {
    let sources_by_status = storage.count_sources_by_status()?;
    let total_sources = sources_by_status.values().sum();

    Ok(CrawlStatistics {
        total_sources,
        sources_by_status,
        total_posts: storage.count_posts()?,
        latest_posts: storage.latest_posts(LATEST_POSTS)?,
        last_run: storage.latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Blogroll Statistics ===\n");

    println!("Sources ({}):", stats.total_sources);
    for status in SourceStatus::all() {
        let count = stats.sources_by_status.get(&status).copied().unwrap_or(0);
        println!("  {}: {}", status, count);
    }
    println!();

    println!("Posts: {}", stats.total_posts);
    if !stats.latest_posts.is_empty() {
        println!("\nLatest Posts:");
        for post in &stats.latest_posts {
            println!(
                "  {} {} <{}>",
                post.published_at.format("%Y-%m-%d"),
                post.title,
                post.original_url
            );
        }
    }
    println!();

    match &stats.last_run {
        Some(run) => {
            println!("Last Run (#{}):", run.id);
            println!("  Finished: {}", run.finished_at.to_rfc3339());
            println!(
                "  Sources: {}/{} processed, {} errors",
                run.processed_sources, run.total_sources, run.error_count
            );
            println!("  New posts: {}", run.posts_saved);
        }
        None => println!("No runs recorded yet"),
    }
}
