//! Observable scope of the pipeline run in progress
//!
//! Matching never reads this state; every parsing function receives its
//! [`ScopeFilter`] explicitly. The cell only reports which scope the
//! coordinator is currently serving, and a guard guarantees it returns to
//! [`ScopeState::Idle`] however the run ends.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::schema::{ProposalToken, ScopeFilter};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeState {
    #[default]
    Idle,
    Scoped {
        token: Option<ProposalToken>,
        since: Option<DateTime<Utc>>,
    },
}

impl ScopeState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ScopeState::Idle)
    }
}

#[derive(Debug, Default)]
pub struct ScopeCell {
    state: RwLock<ScopeState>,
}

impl ScopeCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ScopeState {
        self.state.read().clone()
    }

    /// Move to `Scoped` for `scope` until the returned guard drops.
    ///
    /// Callers hold the coordinator's run lock, so scopes never nest.
    pub fn enter(&self, scope: &ScopeFilter) -> ScopeGuard<'_> {
        *self.state.write() = ScopeState::Scoped {
            token: scope.token.clone(),
            since: scope.since,
        };
        ScopeGuard { cell: self }
    }
}

/// Resets the cell to `Idle` on drop
#[must_use = "the scope resets as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    cell: &'a ScopeCell,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        *self.cell.state.write() = ScopeState::Idle;
    }
}
