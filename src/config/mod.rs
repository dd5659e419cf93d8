//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only `[storage] database-path` is required; every other key has a default.
//!
//! # Example
//!
//! ```no_run
//! use blogroll::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("blogroll.toml")).unwrap();
//! println!("Crawling {} configured sources", config.sources.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, NotifyConfig, ProxyConfig, RetryConfig, ScheduleConfig, SourceEntry,
    StorageConfig, DEFAULT_PROXY_DOMAINS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
