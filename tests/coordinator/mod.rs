//! Coordinator behaviour over in-memory sources

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pivote_engine::{
    PipelineError, ProposalToken, RefreshConfig, RefreshCoordinator, Result, ScopeFilter,
    SourceAdapter, SourceKind, SourceUnit, StaticSource,
};

use crate::common::*;

/// Serves fixture commits the way `git log --since` does: commits at or
/// after the cutoff, oldest first. Tracks overlapping fetches.
struct FixtureSource {
    commits: Vec<CommitFixture>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay: Duration,
}

impl FixtureSource {
    fn new(commits: Vec<CommitFixture>) -> Self {
        Self {
            commits,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }
}

impl SourceAdapter for FixtureSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cli
    }

    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn fetch(&mut self, scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);

        let blob = self
            .commits
            .iter()
            .filter(|c| scope.since.map_or(true, |since| c.date() >= since))
            .map(CommitFixture::log_text)
            .collect::<String>();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![SourceUnit::Text(blob)])
    }
}

struct OfflineSource;

impl SourceAdapter for OfflineSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn prepare(&mut self) -> Result<()> {
        Err(PipelineError::SourceUnavailable {
            source_kind: SourceKind::Api,
            message: "API rate limit exceeded".to_string(),
        })
    }

    fn fetch(&mut self, _scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        Ok(Vec::new())
    }
}

fn two_token_commits() -> Vec<CommitFixture> {
    vec![
        CommitFixture::new("aa01", "2019-03-01T01:00:00Z")
            .file(T1, vec![add(T1, &ticket(1), "2")])
            .file(T2, vec![add(T2, &ticket(2), "1")]),
        CommitFixture::new("aa02", "2019-03-01T02:00:00Z")
            .file(T2, vec![add(T2, &ticket(3), "2")]),
    ]
}

#[test]
fn test_query_static_source() {
    let coordinator = RefreshCoordinator::new(StaticSource::from_text(log_of(&two_token_commits())));
    let report = coordinator.query(&ScopeFilter::any()).unwrap();
    assert_eq!(report.histories.len(), 2);
    assert_eq!(report.vote_count(), 3);
    assert!(report.failures.is_empty());
}

#[test]
fn test_concurrent_scoped_queries_are_serialized() {
    let mut source = FixtureSource::new(two_token_commits());
    source.delay = Duration::from_millis(15);
    let max_in_flight = Arc::clone(&source.max_in_flight);
    let coordinator = RefreshCoordinator::new(source);

    let workers: Vec<_> = (0..6)
        .map(|n| {
            let coordinator = coordinator.clone();
            thread::spawn(move || {
                let token = if n % 2 == 0 { T1 } else { T2 };
                let scope = ScopeFilter::for_token(ProposalToken::parse(token).unwrap());
                let report = coordinator.query(&scope).unwrap();
                (token, report)
            })
        })
        .collect();

    for worker in workers {
        let (token, report) = worker.join().unwrap();
        assert!(!report.histories.is_empty());
        for history in &report.histories {
            for file in &history.patch {
                assert_eq!(file.token.as_str(), token);
            }
        }
    }

    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert!(coordinator.current_scope().is_idle());
}

#[test]
fn test_scope_resets_after_failed_query() {
    let coordinator = RefreshCoordinator::new(OfflineSource);
    let scope = ScopeFilter::for_token(ProposalToken::parse(T1).unwrap());

    let err = coordinator.query(&scope).unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    assert!(coordinator.current_scope().is_idle());
}

#[test]
fn test_incremental_refresh_cursor() {
    let commits = two_token_commits();
    let newest = commits[1].date();
    let coordinator = RefreshCoordinator::new(FixtureSource::new(commits));
    let notifications = coordinator.subscribe();

    let first = coordinator.refresh().unwrap();
    assert_eq!(first.commits, 2);
    assert_eq!(first.cursor, Some(newest));
    assert!(notifications.try_take());

    // The source re-delivers the boundary commit; the exact-equality
    // cutoff drops it
    let second = coordinator.refresh().unwrap();
    assert_eq!(second.commits, 0);
    assert_eq!(second.cursor, Some(newest));
    assert_eq!(coordinator.cursor(), Some(newest));
}

#[test]
fn test_concurrent_refreshes_share_the_cursor() {
    let mut source = FixtureSource::new(two_token_commits());
    source.delay = Duration::from_millis(30);
    let coordinator = RefreshCoordinator::new(source);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = coordinator.clone();
            thread::spawn(move || coordinator.refresh().unwrap().commits)
        })
        .collect();
    let delivered: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    assert_eq!(delivered, 2);
}

#[test]
fn test_unconsumed_notification_is_not_queued() {
    let coordinator = RefreshCoordinator::new(StaticSource::default());
    let notifications = coordinator.subscribe();

    coordinator.trigger_refresh().unwrap();
    coordinator.trigger_refresh().unwrap();
    coordinator.trigger_refresh().unwrap();

    assert!(notifications.try_take());
    assert!(!notifications.try_take());
}

#[test]
fn test_background_failure_keeps_running_without_notifying() {
    let config = RefreshConfig {
        interval: Duration::from_millis(10),
        ..RefreshConfig::default()
    };
    let coordinator = RefreshCoordinator::with_config(OfflineSource, config);
    let notifications = coordinator.subscribe();
    let handle = coordinator.start().unwrap();

    assert!(!notifications.wait_timeout(Duration::from_millis(100)));
    assert!(handle.is_running());
    assert!(coordinator.last_refresh().is_none());
    handle.stop();
}

#[test]
fn test_strict_query_fails_whole_batch() {
    let commits = vec![
        CommitFixture::new("bb01", "2019-03-01T01:00:00Z").file(T1, vec![add(T1, &ticket(1), "2")]),
        CommitFixture::new("bb02", "2019-03-01T02:00:00Z")
            .file(T1, vec![add(T1, &ticket(2), "2")])
            .without_date(),
    ];
    let coordinator = RefreshCoordinator::new(FixtureSource::new(commits));

    let lenient = coordinator.query(&ScopeFilter::any()).unwrap();
    assert_eq!(lenient.histories.len(), 1);
    assert_eq!(lenient.failures.len(), 1);

    assert!(coordinator.query(&ScopeFilter::any().strict()).is_err());
}
