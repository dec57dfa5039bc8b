//! Serialized access to a source, periodic refresh and notifications
//!
//! - `refresh`: the [`RefreshCoordinator`] and its background loop
//! - `state`: observable [`ScopeState`] of the run in progress
//! - `notify`: single-slot mailbox behind [`NotificationHandle`]
//! - `events`: JSON Lines events for `pivote watch`

pub mod events;
pub mod notify;
pub mod refresh;
pub mod state;

pub use events::{
    emit_event, init_event_emitter, EngineEvent, EventEmitter, RefreshCompletedEvent,
    RefreshFailedEvent, WatchStatusEvent,
};
pub use notify::{Mailbox, NotificationHandle};
pub use refresh::{RefreshConfig, RefreshCoordinator, RefreshHandle, RefreshSummary};
pub use state::{ScopeCell, ScopeGuard, ScopeState};
