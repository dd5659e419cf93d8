//! HTTP feed fetcher
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with a browser-like identity
//! - Per-attempt timeouts and retry through `RetryPolicy`
//! - Disabling compression negotiation for proxied requests
//! - Error classification

use crate::config::CrawlerConfig;
use crate::crawler::RetryPolicy;
use crate::model::RawFeed;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ACCEPT_FEEDS: &str = "application/rss+xml, application/xml, text/xml, */*";

const ACCEPT_LANGUAGES: &str = "ko-KR,ko;q=0.9,en;q=0.8";

const REFERER_URL: &str = "https://www.google.com/";

/// Errors from retrieving a feed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }

    /// The last underlying cause, unwrapping retry exhaustion
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Retrieves raw feed bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetches `target_url`; `is_proxied` marks a URL produced by the proxy resolver
    async fn fetch(&self, target_url: &str, is_proxied: bool) -> Result<RawFeed, FetchError>;
}

/// Builds an HTTP client that presents itself as a desktop browser
///
/// Some feed hosts reject obvious bot user agents, so the client identifies as
/// Chrome and negotiates gzip and brotli like one.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `FeedFetcher` over reqwest with retry
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpFeedFetcher {
    pub fn new(client: Client, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            timeout,
            retry,
        }
    }

    pub fn from_config(config: &CrawlerConfig, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_http_client()?,
            Duration::from_millis(config.request_timeout_ms),
            retry,
        ))
    }

    async fn fetch_once(&self, url: &str, is_proxied: bool) -> Result<RawFeed, FetchError> {
        let mut request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(ACCEPT, ACCEPT_FEEDS)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGES)
            .header(CACHE_CONTROL, "no-cache")
            .header(REFERER, REFERER_URL);

        if is_proxied {
            // Proxies tend to mangle compressed bodies
            request = request.header(ACCEPT_ENCODING, "identity");
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        if body.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(RawFeed::new(url, body.to_vec()))
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, target_url: &str, is_proxied: bool) -> Result<RawFeed, FetchError> {
        self.retry
            .run(target_url, |_| self.fetch_once(target_url, is_proxied))
            .await
    }
}
