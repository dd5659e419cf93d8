use serde::Deserialize;

use crate::model::SourceStatus;

/// Proxy-requiring feed URL fragments used when none are configured
pub const DEFAULT_PROXY_DOMAINS: &[&str] = &[
    "techblog.woowahan.com",
    "medium.com/feed/musinsa-tech",
    "medium.com/feed/daangn",
    "techblog.gccompany.co.kr/feed",
];

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Per-attempt HTTP timeout (milliseconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum number of sources crawled at the same time
    #[serde(
        rename = "max-concurrent-sources",
        default = "default_max_concurrent_sources"
    )]
    pub max_concurrent_sources: usize,

    /// Maximum number of valid entries taken from a single feed per run
    #[serde(rename = "max-posts-per-feed", default = "default_max_posts_per_feed")]
    pub max_posts_per_feed: usize,

    /// Overall run deadline (seconds); unset means no deadline
    #[serde(rename = "run-deadline", default)]
    pub run_deadline_secs: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            max_concurrent_sources: default_max_concurrent_sources(),
            max_posts_per_feed: default_max_posts_per_feed(),
            run_deadline_secs: None,
        }
    }
}

/// Retry policy for feed fetches
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds)
    #[serde(rename = "base-delay", default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay (milliseconds)
    #[serde(rename = "max-delay", default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

/// Proxy routing for feeds that block direct fetches
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Proxy endpoint prefix; the encoded feed URL is appended to it
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Feed URL fragments that must go through the proxy
    #[serde(default = "default_proxy_domains")]
    pub domains: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            domains: default_proxy_domains(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Completion notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Log a summary of every run worth reporting
    #[serde(rename = "log-summary", default = "default_true")]
    pub log_summary: bool,

    /// Endpoint receiving the completion event as JSON
    #[serde(rename = "webhook-url", default)]
    pub webhook_url: Option<String>,

    /// Webhook request timeout (milliseconds)
    #[serde(rename = "webhook-timeout", default = "default_webhook_timeout")]
    pub webhook_timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            log_summary: true,
            webhook_url: None,
            webhook_timeout_ms: default_webhook_timeout(),
        }
    }
}

/// Periodic run configuration (used by `--watch`)
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between the start of consecutive runs
    #[serde(rename = "interval", default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

/// A source to seed into the source directory
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,

    #[serde(rename = "feed-url")]
    pub feed_url: String,

    #[serde(rename = "site-url", default)]
    pub site_url: Option<String>,

    #[serde(default = "default_status")]
    pub status: SourceStatus,
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_concurrent_sources() -> usize {
    4
}

fn default_max_posts_per_feed() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_proxy_domains() -> Vec<String> {
    DEFAULT_PROXY_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_webhook_timeout() -> u64 {
    5_000
}

fn default_interval() -> u64 {
    3_600
}

fn default_status() -> SourceStatus {
    SourceStatus::Active
}
