//! Output module for run summaries and storage statistics
//!
//! This module handles:
//! - Formatting the result of a crawl run for the terminal
//! - Loading and printing statistics from the database

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::model::CrawlingResult;
use std::fmt::Write;

/// Formats a run result as a human-readable summary
pub fn format_crawl_result(result: &CrawlingResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Result ===\n");
    let _ = writeln!(out, "Started:  {}", result.started_at.to_rfc3339());
    let _ = writeln!(out, "Finished: {}", result.finished_at.to_rfc3339());
    let _ = writeln!(
        out,
        "Duration: {:.1}s",
        result.duration().num_milliseconds() as f64 / 1000.0
    );
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Sources: {} processed, {} failed, {} total",
        result.processed_sources,
        result.failed_sources(),
        result.total_sources
    );
    let _ = writeln!(out, "New posts: {}", result.posts_saved);

    let productive: Vec<_> = result
        .source_results
        .iter()
        .filter(|r| r.posts_saved > 0)
        .collect();
    if !productive.is_empty() {
        let _ = writeln!(out, "\nNew posts by source:");
        for source in productive {
            let _ = writeln!(
                out,
                "  {}: {} new of {} entries",
                source.source_name, source.posts_saved, source.entries_found
            );
        }
    }

    if result.has_errors() {
        let _ = writeln!(out, "\nErrors ({}):", result.errors.len());
        for error in &result.errors {
            let _ = writeln!(
                out,
                "  [{}] {} (#{}): {}",
                error.kind, error.source_name, error.source_id, error.message
            );
        }
    }

    out
}

/// Prints a run result to stdout
pub fn print_crawl_result(result: &CrawlingResult) {
    print!("{}", format_crawl_result(result));
}
