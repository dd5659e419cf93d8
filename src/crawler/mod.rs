//! Crawler module for feed fetching and ingestion
//!
//! This module contains the core crawling logic, including:
//! - Proxy routing for feeds that block direct requests
//! - HTTP fetching with retry and backoff
//! - RSS/Atom/JSON Feed parsing into validated entries
//! - Entry to post conversion
//! - Run coordination and interval scheduling

mod coordinator;
mod fetcher;
mod normalizer;
mod parser;
mod proxy;
mod retry;
mod scheduler;

pub use coordinator::{Collaborators, Coordinator, CrawlSettings};
pub use fetcher::{build_http_client, FeedFetcher, FetchError, HttpFeedFetcher};
pub use normalizer::to_post;
pub use parser::{FeedParser, ParseError, SyndicationParser};
pub use proxy::{encode_for_proxy, ProxyDecision, ProxyEncodingError, ProxyResolver, ResolveProxy};
pub use retry::RetryPolicy;
pub use scheduler::{shutdown_on, Scheduler};

#[cfg(test)]
pub use fetcher::MockFeedFetcher;
#[cfg(test)]
pub use proxy::MockResolveProxy;
