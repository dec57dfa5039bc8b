//! Vote record schema
//!
//! These are the types handed back to callers. Every value is built fresh
//! per query from the raw commit text and nothing here is cached.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Length of a Politeia proposal token
pub const TOKEN_LEN: usize = 64;

/// 64-character alphanumeric proposal identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalToken(String);

impl ProposalToken {
    /// Validate and wrap a token. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == TOKEN_LEN && trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(PipelineError::InvalidToken {
                token: raw.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProposalToken {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProposalToken {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ProposalToken> for String {
    fn from(token: ProposalToken) -> Self {
        token.0
    }
}

/// Commit level metadata recovered from the commit header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitMeta {
    /// Free text "Name <email>"
    pub author: String,
    /// Full hex commit SHA
    pub commit_sha: String,
    pub date: DateTime<Utc>,
}

/// Semantic vote choice derived from the vote bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Choice {
    Yes,
    No,
    Unknown,
}

impl Choice {
    /// Map a vote bit code to a choice. Never fails: anything other than
    /// "1" or "2" is `Unknown`.
    pub fn from_vote_bit(bit: &str) -> Self {
        match bit {
            "1" => Self::No,
            "2" => Self::Yes,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    /// Ticket hash that cast the vote
    pub ticket: String,
    pub choice: Choice,
}

/// Votes for a single proposal inside one commit, in diff order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileVotes {
    pub token: ProposalToken,
    pub votes: Vec<VoteRecord>,
}

/// A commit that carried at least one vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct History {
    pub author: String,
    pub commit_sha: String,
    pub date: DateTime<Utc>,
    pub patch: Vec<FileVotes>,
}

impl History {
    pub fn new(meta: CommitMeta, patch: Vec<FileVotes>) -> Self {
        Self {
            author: meta.author,
            commit_sha: meta.commit_sha,
            date: meta.date,
            patch,
        }
    }

    /// Total votes across every token in this commit
    pub fn vote_count(&self) -> usize {
        self.patch.iter().map(|f| f.votes.len()).sum()
    }
}

/// How per-commit failures are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Return every commit that parsed, plus the list of failures
    #[default]
    Lenient,
    /// Fail the whole call on the first malformed commit
    Strict,
}

/// Scope of one query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeFilter {
    /// Proposal to restrict to; `None` matches any token
    pub token: Option<ProposalToken>,
    /// Cutoff of an incremental sync. A commit dated exactly at the cutoff
    /// was already delivered by the previous sync and is dropped.
    pub since: Option<DateTime<Utc>>,
    pub mode: ParseMode,
}

impl ScopeFilter {
    /// Match every proposal token
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_token(token: ProposalToken) -> Self {
        Self {
            token: Some(token),
            ..Self::default()
        }
    }

    pub fn since(mut self, cutoff: DateTime<Utc>) -> Self {
        self.since = Some(cutoff);
        self
    }

    pub fn strict(mut self) -> Self {
        self.mode = ParseMode::Strict;
        self
    }
}
