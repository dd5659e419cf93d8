//! Interval scheduler for recurring crawl runs
//!
//! Each tick triggers one batch run over all active sources. A run that is
//! still going when the next tick fires causes that tick to be skipped rather
//! than queued.

use crate::crawler::Coordinator;
use crate::model::CrawlingResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Resolves when `signal` fires
///
/// A signal that cannot be registered never resolves, so the schedule keeps
/// running instead of stopping before its first run.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Drives `Coordinator::crawl_all_active` on a fixed interval
pub struct Scheduler {
    coordinator: Arc<Coordinator>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(coordinator: Arc<Coordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs until `shutdown` resolves, returning the number of completed runs
    ///
    /// The first run starts immediately. `on_result` sees every successful
    /// run; runs that fail outright are logged and the schedule continues.
    pub async fn run_until<F, H>(&self, shutdown: F, mut on_result: H) -> usize
    where
        F: Future<Output = ()>,
        H: FnMut(&CrawlingResult),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut runs = 0;
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping after {} runs", runs);
                    break;
                }
                _ = ticker.tick() => {
                    tracing::debug!("Scheduled run #{} starting", runs + 1);
                    match self.coordinator.crawl_all_active().await {
                        Ok(result) => {
                            runs += 1;
                            on_result(&result);
                        }
                        Err(e) => tracing::error!("Scheduled crawl failed: {}", e),
                    }
                }
            }
        }

        runs
    }
}
