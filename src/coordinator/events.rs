//! Refresh events as JSON Lines
//!
//! When enabled, the coordinator reports each background refresh on
//! stdout, one JSON object per line:
//! ```json
//! {"type":"refresh_completed","source":"cli","commits":3,"votes":120,...}
//! ```
//!
//! # Event Types
//!
//! - `refresh_completed` - a refresh parsed new commits
//! - `refresh_failed` - a refresh failed and will be retried next interval
//! - `watch_status` - the refresh loop started or stopped

use std::io::{self, Write};
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::PipelineError;
use crate::source::SourceKind;

use super::refresh::RefreshSummary;

/// Event emitter for sending JSON events to stdout
pub struct EventEmitter {
    enabled: bool,
}

impl EventEmitter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Emit an event to stdout as JSON
    pub fn emit<E: EngineEvent>(&self, event: &E) {
        if !self.enabled {
            return;
        }

        if let Some(json) = to_json_line(event) {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Reader may be gone
            let _ = writeln!(handle, "{}", json);
            let _ = handle.flush();
        }
    }
}

/// Wrapper for events with type field
#[derive(Serialize)]
struct EventWrapper<'a, P: Serialize> {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(flatten)]
    payload: &'a P,
}

/// Trait for engine events
pub trait EngineEvent: Serialize {
    fn event_type() -> &'static str;
}

/// Serialize an event with its `type` tag
pub fn to_json_line<E: EngineEvent>(event: &E) -> Option<String> {
    let wrapper = EventWrapper {
        event_type: E::event_type(),
        payload: event,
    };
    serde_json::to_string(&wrapper).ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshCompletedEvent {
    pub source: SourceKind,
    /// Commits parsed in this refresh
    pub commits: usize,
    pub votes: usize,
    /// Commits skipped in lenient mode
    pub failures: usize,
    /// Date of the newest commit seen so far (RFC 3339)
    pub cursor: Option<String>,
    pub duration_ms: u64,
    pub timestamp: String,
}

impl EngineEvent for RefreshCompletedEvent {
    fn event_type() -> &'static str {
        "refresh_completed"
    }
}

impl RefreshCompletedEvent {
    pub fn from_summary(source: SourceKind, summary: &RefreshSummary) -> Self {
        Self {
            source,
            commits: summary.commits,
            votes: summary.votes,
            failures: summary.failures,
            cursor: summary.cursor.map(|c| c.to_rfc3339()),
            duration_ms: summary.duration.as_millis() as u64,
            timestamp: summary.completed_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshFailedEvent {
    pub source: SourceKind,
    /// Pipeline stage that failed
    pub stage: String,
    pub message: String,
    pub timestamp: String,
}

impl EngineEvent for RefreshFailedEvent {
    fn event_type() -> &'static str {
        "refresh_failed"
    }
}

impl RefreshFailedEvent {
    pub fn from_error(source: SourceKind, error: &PipelineError) -> Self {
        Self {
            source,
            stage: error.stage().to_string(),
            message: error.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchStatusEvent {
    /// started or stopped
    pub status: String,
    pub source: SourceKind,
    pub interval_secs: u64,
    pub timestamp: String,
}

impl EngineEvent for WatchStatusEvent {
    fn event_type() -> &'static str {
        "watch_status"
    }
}

impl WatchStatusEvent {
    pub fn started(source: SourceKind, interval_secs: u64) -> Self {
        Self::with_status("started", source, interval_secs)
    }

    pub fn stopped(source: SourceKind, interval_secs: u64) -> Self {
        Self::with_status("stopped", source, interval_secs)
    }

    fn with_status(status: &str, source: SourceKind, interval_secs: u64) -> Self {
        Self {
            status: status.to_string(),
            source,
            interval_secs,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

static GLOBAL_EMITTER: OnceLock<EventEmitter> = OnceLock::new();

/// Initialize the global event emitter
pub fn init_event_emitter(enabled: bool) {
    let _ = GLOBAL_EMITTER.set(EventEmitter::new(enabled));
}

/// Emit an event using the global emitter
pub fn emit_event<E: EngineEvent>(event: &E) {
    if let Some(emitter) = GLOBAL_EMITTER.get() {
        emitter.emit(event);
    }
}
