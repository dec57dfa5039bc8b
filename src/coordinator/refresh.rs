//! Query serialization and the periodic refresh loop
//!
//! # Locking
//!
//! One coarse `parking_lot::Mutex` guards the source. A foreground query
//! and a background refresh both take it before entering a scope or
//! touching the source, so at most one pipeline run is in flight and every
//! other caller blocks until it ends. Parsing itself shares nothing.
//!
//! # Refresh
//!
//! The background thread wakes every `interval`, prepares the source
//! (clone/pull), and parses everything newer than the cursor left by the
//! previous successful refresh. A success posts to the single-slot
//! mailbox; a failure is logged and retried at the next tick.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};

use crate::config::RefreshSettings;
use crate::error::Result;
use crate::parsing::{collect, parse_units, QueryReport};
use crate::schema::{ParseMode, ScopeFilter};
use crate::source::{SourceAdapter, SourceKind};

use super::events::{emit_event, RefreshCompletedEvent, RefreshFailedEvent};
use super::notify::{Mailbox, NotificationHandle};
use super::state::{ScopeCell, ScopeState};

/// Configuration for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between background refreshes, and maximum age of a prepared
    /// source before a query prepares it again (default: 1h)
    pub interval: Duration,
    /// Failure handling for background refreshes
    pub mode: ParseMode,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            mode: ParseMode::Lenient,
        }
    }
}

impl From<&RefreshSettings> for RefreshConfig {
    fn from(settings: &RefreshSettings) -> Self {
        Self {
            interval: settings.interval(),
            mode: settings.mode(),
        }
    }
}

/// Outcome of one successful refresh
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub completed_at: DateTime<Utc>,
    pub commits: usize,
    pub votes: usize,
    pub failures: usize,
    /// Newest commit date seen; the `since` of the next refresh
    pub cursor: Option<DateTime<Utc>>,
    pub duration: Duration,
}

struct SourceSlot<S> {
    source: S,
    prepared_at: Option<Instant>,
}

impl<S: SourceAdapter> SourceSlot<S> {
    fn prepare(&mut self) -> Result<()> {
        self.source.prepare()?;
        self.prepared_at = Some(Instant::now());
        Ok(())
    }

    fn ensure_prepared(&mut self, max_age: Duration) -> Result<()> {
        match self.prepared_at {
            Some(at) if at.elapsed() < max_age => Ok(()),
            _ => {
                tracing::debug!(source = %self.source.kind(), "source stale, preparing");
                self.prepare()
            }
        }
    }
}

struct Shared<S> {
    /// Coarse run lock
    slot: Mutex<SourceSlot<S>>,
    kind: SourceKind,
    scope: ScopeCell,
    mailbox: Arc<Mailbox>,
    cursor: Mutex<Option<DateTime<Utc>>>,
    last_refresh: Mutex<Option<RefreshSummary>>,
    config: RefreshConfig,
}

impl<S: SourceAdapter> Shared<S> {
    fn query(&self, scope: &ScopeFilter) -> Result<QueryReport> {
        let mut slot = self.slot.lock();
        let _scope = self.scope.enter(scope);

        slot.ensure_prepared(self.config.interval)?;
        let units = slot.source.fetch(scope)?;
        collect(parse_units(&units, scope), scope.mode)
    }

    fn refresh(&self) -> Result<RefreshSummary> {
        let started = Instant::now();

        // The cursor is read and advanced under the run lock
        let (report, cursor) = {
            let mut slot = self.slot.lock();
            let scope = ScopeFilter {
                token: None,
                since: *self.cursor.lock(),
                mode: self.config.mode,
            };
            let _scope = self.scope.enter(&scope);

            slot.prepare()?;
            let units = slot.source.fetch(&scope)?;
            let report = collect(parse_units(&units, &scope), scope.mode)?;

            let newest = report.histories.iter().map(|h| h.date).max();
            let mut cursor = self.cursor.lock();
            if newest > *cursor {
                *cursor = newest;
            }
            let cursor = *cursor;
            (report, cursor)
        };

        let summary = RefreshSummary {
            completed_at: Utc::now(),
            commits: report.histories.len(),
            votes: report.vote_count(),
            failures: report.failures.len(),
            cursor,
            duration: started.elapsed(),
        };
        *self.last_refresh.lock() = Some(summary.clone());

        tracing::info!(
            source = %self.kind,
            commits = summary.commits,
            votes = summary.votes,
            failures = summary.failures,
            "refresh completed in {:?}",
            summary.duration
        );

        if !self.mailbox.post() {
            tracing::debug!("previous notification not consumed, dropping this one");
        }
        emit_event(&RefreshCompletedEvent::from_summary(self.kind, &summary));

        Ok(summary)
    }
}

/// Serializes queries and refreshes over one source
pub struct RefreshCoordinator<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for RefreshCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: SourceAdapter + 'static> RefreshCoordinator<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, RefreshConfig::default())
    }

    pub fn with_config(source: S, config: RefreshConfig) -> Self {
        let kind = source.kind();
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(SourceSlot {
                    source,
                    prepared_at: None,
                }),
                kind,
                scope: ScopeCell::new(),
                mailbox: Arc::new(Mailbox::new()),
                cursor: Mutex::new(None),
                last_refresh: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.shared.kind
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.shared.config
    }

    /// Run the pipeline for `scope`, blocking while another run holds the
    /// lock. Prepares the source first when it is older than the refresh
    /// interval.
    pub fn query(&self, scope: &ScopeFilter) -> Result<QueryReport> {
        self.shared.query(scope)
    }

    /// Handle on the single-slot "new data" notification
    pub fn subscribe(&self) -> NotificationHandle {
        NotificationHandle::new(Arc::clone(&self.shared.mailbox))
    }

    /// Refresh now, outside the timer
    pub fn trigger_refresh(&self) -> Result<()> {
        self.refresh().map(|_| ())
    }

    /// Refresh now and report what was parsed
    pub fn refresh(&self) -> Result<RefreshSummary> {
        self.shared.refresh()
    }

    /// Scope of the run in progress, `Idle` between runs
    pub fn current_scope(&self) -> ScopeState {
        self.shared.scope.get()
    }

    pub fn last_refresh(&self) -> Option<RefreshSummary> {
        self.shared.last_refresh.lock().clone()
    }

    /// Newest commit date delivered by a refresh so far
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        *self.shared.cursor.lock()
    }

    /// Start the periodic refresh thread.
    ///
    /// The first refresh happens one interval from now.
    pub fn start(&self) -> Result<RefreshHandle> {
        let stop = Arc::new(StopSignal::default());
        let shared = Arc::clone(&self.shared);
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("pivote-refresh".to_string())
            .spawn(move || {
                let interval = shared.config.interval;
                while !thread_stop.wait(interval) {
                    if let Err(e) = shared.refresh() {
                        tracing::error!("Background refresh failed: {}", e);
                        emit_event(&RefreshFailedEvent::from_error(shared.kind, &e));
                    }
                }
                tracing::debug!("refresh loop stopped");
            })?;

        Ok(RefreshHandle {
            stop,
            thread: Some(thread),
        })
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    /// Sleep up to `timeout`; true once stop was requested
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.cond.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }

    fn signal(&self) {
        *self.stopped.lock() = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.stopped.lock()
    }
}

/// Handle for controlling a running refresh loop
pub struct RefreshHandle {
    stop: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stop the loop and wait for an in-flight refresh to finish
    pub fn stop(mut self) {
        self.stop.signal();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        !self.stop.is_set() && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop.signal();
    }
}
