//! Completion notification
//!
//! When a run finishes, the coordinator publishes a `CrawlCompleted` event.
//! Every registered listener receives it on its own task, so a slow or failing
//! listener never delays or fails the crawl.

mod listeners;

pub use listeners::{ChannelListener, LogListener, WebhookListener};

use crate::config::NotifyConfig;
use crate::model::CrawlingResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors raised by listeners; logged, never propagated to the crawl
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    Status(u16),

    #[error("Listener is no longer receiving events")]
    Closed,
}

/// Signal that a run has completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlCompleted {
    pub result: CrawlingResult,
    pub occurred_at: DateTime<Utc>,
}

impl CrawlCompleted {
    pub fn should_notify(&self) -> bool {
        self.result.should_notify()
    }
}

/// Receives completion events
#[async_trait]
pub trait CrawlListener: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn on_crawl_completed(&self, event: &CrawlCompleted) -> Result<(), NotifyError>;
}

/// Fans a completion event out to listeners
#[derive(Clone, Default)]
pub struct CompletionNotifier {
    listeners: Vec<Arc<dyn CrawlListener>>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the notifier described by the `[notify]` configuration
    pub fn from_config(config: &NotifyConfig) -> Result<Self, reqwest::Error> {
        let mut notifier = Self::new();

        if config.log_summary {
            notifier.subscribe(Arc::new(LogListener));
        }

        if let Some(url) = &config.webhook_url {
            let timeout = Duration::from_millis(config.webhook_timeout_ms);
            notifier.subscribe(Arc::new(WebhookListener::new(url.clone(), timeout)?));
        }

        Ok(notifier)
    }

    pub fn subscribe(&mut self, listener: Arc<dyn CrawlListener>) {
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn CrawlListener>) -> Self {
        self.subscribe(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatches the event to every listener without waiting for them
    ///
    /// Must be called from within a Tokio runtime. The returned handles may be
    /// dropped; listeners keep running detached.
    pub fn publish(&self, result: CrawlingResult, occurred_at: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let event = Arc::new(CrawlCompleted {
            result,
            occurred_at,
        });

        self.listeners
            .iter()
            .map(|listener| {
                let listener = Arc::clone(listener);
                let event = Arc::clone(&event);
                tokio::spawn(async move {
                    if let Err(e) = listener.on_crawl_completed(&event).await {
                        tracing::error!(
                            "Listener '{}' failed to handle crawl completion: {}",
                            listener.name(),
                            e
                        );
                    }
                })
            })
            .collect()
    }
}
