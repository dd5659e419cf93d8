//! Built-in completion listeners

use super::{CrawlCompleted, CrawlListener, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Logs a run summary when the run is worth reporting
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

#[async_trait]
impl CrawlListener for LogListener {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_crawl_completed(&self, event: &CrawlCompleted) -> Result<(), NotifyError> {
        if !event.should_notify() {
            debug!("Crawl finished with no new posts and no errors");
            return Ok(());
        }

        let result = &event.result;
        info!(
            "Crawl finished: {} new posts from {}/{} sources in {}s",
            result.posts_saved,
            result.processed_sources,
            result.total_sources,
            result.duration().num_seconds()
        );

        for error in &result.errors {
            warn!(
                "  {} (#{}) [{}]: {}",
                error.source_name, error.source_id, error.kind, error.message
            );
        }

        Ok(())
    }
}

/// POSTs the completion event as JSON
///
/// Events with nothing to report are skipped.
#[derive(Debug, Clone)]
pub struct WebhookListener {
    client: Client,
    url: String,
}

impl WebhookListener {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl CrawlListener for WebhookListener {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn on_crawl_completed(&self, event: &CrawlCompleted) -> Result<(), NotifyError> {
        if !event.should_notify() {
            return Ok(());
        }

        let response = self.client.post(&self.url).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        debug!("Delivered crawl completion to {}", self.url);
        Ok(())
    }
}

/// Forwards every event into a channel, for embedding the crawler in a
/// larger application
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<Arc<CrawlCompleted>>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Arc<CrawlCompleted>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl CrawlListener for ChannelListener {
    fn name(&self) -> &str {
        "channel"
    }

    async fn on_crawl_completed(&self, event: &CrawlCompleted) -> Result<(), NotifyError> {
        self.sender
            .send(Arc::new(event.clone()))
            .map_err(|_| NotifyError::Closed)
    }
}
