//! pivote-engine: Politeia vote history from git
//!
//! Reads the vote journals that Politeia flushes into the proposals
//! repository and turns every commit into a [`History`]: the commit's
//! author, SHA and date plus the votes it recorded, grouped by proposal.
//!
//! # Pipeline
//!
//! A [`source`] delivers raw commits (a `git log -p` blob, or commits
//! already split by the GitHub API). [`parsing`] segments them, recovers
//! commit metadata, picks the vote journal sections, repairs the journal
//! lines into a JSON array and decodes the votes. Every step takes its
//! [`ScopeFilter`] explicitly.
//!
//! The [`coordinator`] serializes queries and periodic refreshes over one
//! source and signals "new data available" through a single-slot mailbox.
//!
//! # Example
//!
//! ```ignore
//! use pivote_engine::{parse_blob, collect, ScopeFilter, ParseMode};
//!
//! let blob = std::fs::read_to_string("mainnet.log")?;
//! let report = collect(parse_blob(&blob, &ScopeFilter::any()), ParseMode::Lenient)?;
//! for history in &report.histories {
//!     println!("{} {} votes", history.commit_sha, history.vote_count());
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod git;
pub mod parsing;
pub mod schema;
pub mod source;

// Re-export commonly used types
pub use config::EngineConfig;
pub use coordinator::{
    NotificationHandle, RefreshConfig, RefreshCoordinator, RefreshHandle, RefreshSummary,
    ScopeState,
};
pub use error::{PipelineError, Result, Stage};
pub use parsing::{collect, parse_blob, parse_units, CommitObject, FilePatch, QueryReport, SourceUnit};
pub use schema::{
    Choice, CommitMeta, FileVotes, History, ParseMode, ProposalToken, ScopeFilter, VoteRecord,
};
pub use source::{Source, SourceAdapter, SourceKind, StaticSource};
