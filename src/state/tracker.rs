use chrono::{DateTime, Utc};

use super::RunState;
use crate::model::{CrawlingResult, Source, SourceCrawlError, SourceCrawlResult};
use crate::{CrawlError, Result};

/// Accumulates the outcome of one run
///
/// Outcomes must be recorded in source enumeration order; the tracker keeps
/// them in the order they are recorded.
#[derive(Debug)]
pub struct RunTracker {
    state: RunState,
    started_at: Option<DateTime<Utc>>,
    total_sources: usize,
    source_results: Vec<SourceCrawlResult>,
    errors: Vec<SourceCrawlError>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            started_at: None,
            total_sources: 0,
            source_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.state != RunState::Running {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: RunState::Running,
            });
        }
        Ok(())
    }

    /// Marks the run as started over `total_sources` sources
    pub fn start(&mut self, at: DateTime<Utc>, total_sources: usize) -> Result<()> {
        self.transition(RunState::Running)?;
        self.started_at = Some(at);
        self.total_sources = total_sources;
        Ok(())
    }

    pub fn record_success(&mut self, outcome: SourceCrawlResult) -> Result<()> {
        self.ensure_running()?;
        self.source_results.push(outcome);
        Ok(())
    }

    pub fn record_failure(
        &mut self,
        source: &Source,
        error: &CrawlError,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_running()?;
        self.errors.push(SourceCrawlError {
            source_id: source.id,
            source_name: source.name.clone(),
            message: error.to_string(),
            kind: error.kind(),
            occurred_at: at,
        });
        Ok(())
    }

    /// Freezes the run and returns its aggregate
    pub fn finish(&mut self, at: DateTime<Utc>) -> Result<CrawlingResult> {
        self.transition(RunState::Completed)?;

        let source_results = std::mem::take(&mut self.source_results);
        let posts_saved = source_results.iter().map(|r| r.posts_saved).sum();

        Ok(CrawlingResult {
            started_at: self.started_at.unwrap_or(at),
            finished_at: at,
            total_sources: self.total_sources,
            processed_sources: source_results.len(),
            posts_saved,
            source_results,
            errors: std::mem::take(&mut self.errors),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorKind, SourceStatus};
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, minute, 0).unwrap()
    }

    fn source(id: i64) -> Source {
        Source {
            id,
            name: format!("Blog {}", id),
            feed_url: format!("https://blog{}.example.com/feed", id),
            site_url: None,
            status: SourceStatus::Active,
        }
    }

    fn success(id: i64, saved: usize) -> SourceCrawlResult {
        SourceCrawlResult {
            source_id: id,
            source_name: format!("Blog {}", id),
            posts_saved: saved,
            entries_found: saved,
            crawled_at: at(1),
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let mut tracker = RunTracker::new();
        assert_eq!(tracker.state(), RunState::Idle);

        tracker.start(at(0), 3).unwrap();
        assert_eq!(tracker.state(), RunState::Running);

        tracker.record_success(success(1, 2)).unwrap();
        tracker
            .record_failure(&source(2), &CrawlError::SourceNotFound(2), at(1))
            .unwrap();
        tracker.record_success(success(3, 5)).unwrap();

        let result = tracker.finish(at(2)).unwrap();
        assert_eq!(tracker.state(), RunState::Completed);

        assert_eq!(result.total_sources, 3);
        assert_eq!(result.processed_sources, 2);
        assert_eq!(result.posts_saved, 7);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].source_id, 2);
        assert_eq!(result.errors[0].source_name, "Blog 2");
        assert_eq!(result.errors[0].kind, ErrorKind::SourceNotFound);
        assert_eq!(result.duration(), Duration::minutes(2));
    }

    #[test]
    fn test_invalid_feed_url_kind() {
        let mut tracker = RunTracker::new();
        tracker.start(at(0), 1).unwrap();
        let error = CrawlError::InvalidFeedUrl {
            source_id: 1,
            url: "not-a-url".to_string(),
        };
        tracker.record_failure(&source(1), &error, at(0)).unwrap();

        let result = tracker.finish(at(0)).unwrap();
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidFeedUrl);
        assert!(result.errors[0].message.contains("not-a-url"));
    }

    #[test]
    fn test_cannot_record_before_start() {
        let mut tracker = RunTracker::new();
        let err = tracker.record_success(success(1, 1)).unwrap_err();
        assert!(matches!(err, CrawlError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cannot_finish_twice() {
        let mut tracker = RunTracker::new();
        tracker.start(at(0), 0).unwrap();
        tracker.finish(at(1)).unwrap();

        assert!(tracker.finish(at(2)).is_err());
        assert!(tracker.start(at(3), 1).is_err());
        assert!(tracker.record_success(success(1, 1)).is_err());
    }

    #[test]
    fn test_cannot_finish_idle_run() {
        let mut tracker = RunTracker::new();
        let err = tracker.finish(at(0)).unwrap_err();
        assert!(matches!(
            err,
            CrawlError::InvalidTransition {
                from: RunState::Idle,
                to: RunState::Completed
            }
        ));
    }

    #[test]
    fn test_empty_run_has_nothing_to_notify() {
        let mut tracker = RunTracker::new();
        tracker.start(at(0), 0).unwrap();
        let result = tracker.finish(at(0)).unwrap();
        assert!(!result.should_notify());
        assert_eq!(result.processed_sources, 0);
    }
}
