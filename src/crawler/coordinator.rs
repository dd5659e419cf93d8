//! Crawler coordinator - run orchestration
//!
//! A run takes the active sources (or one explicit source), crawls each on a
//! bounded worker pool, folds the per-source outcomes into a `CrawlingResult`
//! in source order, and publishes the result to completion listeners.
//!
//! Per source: validate the feed URL, resolve the fetch strategy, fetch,
//! parse, cap the number of entries, convert to posts and insert the ones
//! whose normalized URL is not stored yet.

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, CrawlerConfig};
use crate::crawler::normalizer::to_post;
use crate::crawler::{
    FeedFetcher, FeedParser, HttpFeedFetcher, ProxyResolver, ResolveProxy, RetryPolicy,
    SyndicationParser,
};
use crate::model::{CrawlingResult, Post, Source, SourceCrawlResult};
use crate::notify::CompletionNotifier;
use crate::state::RunTracker;
use crate::storage::{PostStore, SaveOutcome, SourceDirectory, StorageResult};
use crate::{CrawlError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

/// Collaborators the coordinator drives
#[derive(Clone)]
pub struct Collaborators {
    pub sources: Arc<dyn SourceDirectory>,
    pub posts: Arc<dyn PostStore>,
    pub proxy: Arc<dyn ResolveProxy>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub parser: Arc<dyn FeedParser>,
    pub clock: Arc<dyn Clock>,
}

/// Run-level limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub max_concurrent_sources: usize,
    pub max_posts_per_feed: usize,
    pub run_deadline: Option<Duration>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent_sources: config.max_concurrent_sources.max(1),
            max_posts_per_feed: config.max_posts_per_feed,
            run_deadline: config.run_deadline_secs.map(Duration::from_secs),
        }
    }
}

/// Main crawl coordinator
///
/// Runs are serialized: a second call waits until the active run has finished.
pub struct Coordinator {
    deps: Collaborators,
    settings: CrawlSettings,
    notifier: CompletionNotifier,
    run_lock: Mutex<()>,
    deliveries: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    pub fn new(deps: Collaborators, settings: CrawlSettings, notifier: CompletionNotifier) -> Self {
        Self {
            deps,
            settings,
            notifier,
            run_lock: Mutex::new(()),
            deliveries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Wires the HTTP fetcher, proxy resolver and feed parser from configuration
    /// around a storage backend that serves both sources and posts
    pub fn from_config<S>(config: &Config, storage: Arc<S>, notifier: CompletionNotifier) -> Result<Self>
    where
        S: SourceDirectory + PostStore + 'static,
    {
        let retry = RetryPolicy::from_config(&config.retry);
        let fetcher = HttpFeedFetcher::from_config(&config.crawler, retry)?;

        let deps = Collaborators {
            sources: storage.clone(),
            posts: storage,
            proxy: Arc::new(ProxyResolver::new(&config.proxy)),
            fetcher: Arc::new(fetcher),
            parser: Arc::new(SyndicationParser::new()),
            clock: Arc::new(SystemClock),
        };

        Ok(Self::new(
            deps,
            CrawlSettings::from_config(&config.crawler),
            notifier,
        ))
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawls every active source
    ///
    /// Per-source failures are recorded in the result; only a failure to list
    /// the sources fails the call.
    pub async fn crawl_all_active(&self) -> Result<CrawlingResult> {
        let _run = self.run_lock.lock().await;

        let sources = self.deps.sources.list_active_sources()?;
        tracing::info!("Starting crawl of {} active sources", sources.len());

        let result = self.run_sources(sources).await?;
        tracing::info!(
            "Crawl finished: {} new posts, {}/{} sources processed, {} errors",
            result.posts_saved,
            result.processed_sources,
            result.total_sources,
            result.errors.len()
        );

        self.publish(&result);
        Ok(result)
    }

    /// Crawls one source by id
    ///
    /// Unknown and non-active ids fail with `SourceNotFound` before anything is
    /// fetched. Fetch and parse failures are returned as the call's error.
    pub async fn crawl_source(&self, source_id: i64) -> Result<CrawlingResult> {
        let _run = self.run_lock.lock().await;

        let source = self
            .deps
            .sources
            .get_source(source_id)?
            .filter(Source::is_active)
            .ok_or(CrawlError::SourceNotFound(source_id))?;

        tracing::info!("Starting crawl of source '{}' (#{})", source.name, source.id);

        let mut tracker = RunTracker::new();
        tracker.start(self.deps.clock.now(), 1)?;

        let worker = SourceWorker::new(self.deps.clone(), self.settings.max_posts_per_feed);
        let outcome = match self.settings.run_deadline {
            Some(deadline) => tokio::time::timeout(deadline, worker.crawl(&source))
                .await
                .unwrap_or(Err(CrawlError::DeadlineExceeded { source_id })),
            None => worker.crawl(&source).await,
        };
        tracker.record_success(outcome?)?;

        let result = tracker.finish(self.deps.clock.now())?;
        self.publish(&result);
        Ok(result)
    }

    /// Waits for listener deliveries that are still in flight
    ///
    /// Crawl calls never wait on listeners; a process about to exit calls this
    /// so webhook deliveries are not cut off.
    pub async fn flush_notifications(&self) {
        let pending = match self.deliveries.lock() {
            Ok(mut deliveries) => std::mem::take(&mut *deliveries),
            Err(_) => return,
        };
        for delivery in pending {
            let _ = delivery.await;
        }
    }

    fn publish(&self, result: &CrawlingResult) {
        let handles = self.notifier.publish(result.clone(), self.deps.clock.now());
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.retain(|d| !d.is_finished());
            deliveries.extend(handles);
        }
    }

    async fn run_sources(&self, sources: Vec<Source>) -> Result<CrawlingResult> {
        let mut tracker = RunTracker::new();
        tracker.start(self.deps.clock.now(), sources.len())?;

        let deadline = self.settings.run_deadline.map(|d| Instant::now() + d);
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_sources.max(1)));
        let mut tasks = JoinSet::new();

        for (index, source) in sources.iter().cloned().enumerate() {
            let worker = SourceWorker::new(self.deps.clone(), self.settings.max_posts_per_feed);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let source_id = source.id;
                let work = async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| CrawlError::WorkerFailed { source_id })?;
                    worker.crawl(&source).await
                };

                let outcome = match deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, work)
                        .await
                        .unwrap_or(Err(CrawlError::DeadlineExceeded { source_id })),
                    None => work.await,
                };

                (index, outcome, worker.clock.now())
            });
        }

        let mut outcomes: Vec<Option<(Result<SourceCrawlResult>, DateTime<Utc>)>> =
            sources.iter().map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome, at)) => outcomes[index] = Some((outcome, at)),
                Err(e) => tracing::error!("Crawl task failed: {}", e),
            }
        }

        for (source, outcome) in sources.iter().zip(outcomes) {
            let (outcome, at) = outcome.unwrap_or_else(|| {
                (
                    Err(CrawlError::WorkerFailed {
                        source_id: source.id,
                    }),
                    self.deps.clock.now(),
                )
            });

            match outcome {
                Ok(crawled) => tracker.record_success(crawled)?,
                Err(e) => {
                    tracing::error!("Failed to crawl '{}' (#{}): {}", source.name, source.id, e);
                    tracker.record_failure(source, &e, at)?;
                }
            }
        }

        tracker.finish(self.deps.clock.now())
    }
}

/// Crawls a single source
struct SourceWorker {
    proxy: Arc<dyn ResolveProxy>,
    fetcher: Arc<dyn FeedFetcher>,
    parser: Arc<dyn FeedParser>,
    posts: Arc<dyn PostStore>,
    clock: Arc<dyn Clock>,
    max_posts_per_feed: usize,
}

impl SourceWorker {
    fn new(deps: Collaborators, max_posts_per_feed: usize) -> Self {
        Self {
            proxy: deps.proxy,
            fetcher: deps.fetcher,
            parser: deps.parser,
            posts: deps.posts,
            clock: deps.clock,
            max_posts_per_feed,
        }
    }

    async fn crawl(&self, source: &Source) -> Result<SourceCrawlResult> {
        if !source.has_valid_feed_url() {
            return Err(CrawlError::InvalidFeedUrl {
                source_id: source.id,
                url: source.feed_url.clone(),
            });
        }

        let crawled_at = self.clock.now();
        let decision = self.proxy.resolve(source.feed_url.trim());
        let raw = self
            .fetcher
            .fetch(&decision.final_url, decision.is_proxied)
            .await?;

        let entries = self.parser.parse(&raw, &source.feed_url)?;
        let entries_found = entries.len().min(self.max_posts_per_feed);

        let mut posts_saved = 0;
        for entry in entries.into_iter().take(self.max_posts_per_feed) {
            let post = to_post(&entry, source, self.clock.now());
            let url = post.original_url.clone();

            match self.store(post) {
                Ok(true) => posts_saved += 1,
                Ok(false) => tracing::debug!("Already stored: {}", url),
                Err(e) => tracing::warn!("Failed to save post {} from '{}': {}", url, source.name, e),
            }
        }

        tracing::info!(
            "Crawled '{}': {} new posts out of {} entries",
            source.name,
            posts_saved,
            entries_found
        );

        Ok(SourceCrawlResult {
            source_id: source.id,
            source_name: source.name.clone(),
            posts_saved,
            entries_found,
            crawled_at,
        })
    }

    /// Returns true if the post was inserted
    fn store(&self, post: Post) -> StorageResult<bool> {
        if self.posts.exists_by_normalized_url(&post.normalized_url)? {
            return Ok(false);
        }
        Ok(matches!(self.posts.save(post)?, SaveOutcome::Inserted(_)))
    }
}
