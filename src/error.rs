//! Error types and exit codes for pivote-engine

use std::fmt;
use std::process::ExitCode;

use thiserror::Error;

use crate::source::SourceKind;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Raw data acquisition (git binary, REST API, libgit2)
    Source,
    /// Author / commit / date recovery
    Metadata,
    /// Journal repair and vote decoding
    Repair,
    /// Configuration and argument validation
    Config,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Metadata => "metadata",
            Self::Repair => "repair",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type surfaced to callers of the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{source_kind} source unavailable: {message}")]
    SourceUnavailable {
        source_kind: SourceKind,
        message: String,
    },

    #[error("Malformed commit{}: missing or invalid {field}: {detail}", display_commit(.commit))]
    MalformedCommit {
        commit: Option<String>,
        field: &'static str,
        detail: String,
    },

    #[error("Vote journal repair failed{} for token {token}: {message}", display_commit(.commit))]
    JsonRepairFailure {
        commit: Option<String>,
        token: String,
        message: String,
    },

    #[error("Invalid proposal token: {token:?}")]
    InvalidToken { token: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_commit(commit: &Option<String>) -> String {
    match commit {
        Some(sha) => format!(" {}", sha),
        None => String::new(),
    }
}

impl PipelineError {
    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            Self::SourceUnavailable { .. } | Self::Io(_) => Stage::Source,
            Self::MalformedCommit { .. } => Stage::Metadata,
            Self::JsonRepairFailure { .. } => Stage::Repair,
            Self::InvalidToken { .. } | Self::Config { .. } => Stage::Config,
        }
    }

    /// Commit the error is attached to, when known
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::MalformedCommit { commit, .. } | Self::JsonRepairFailure { commit, .. } => {
                commit.as_deref()
            }
            _ => None,
        }
    }

    /// Attach a commit identifier to a per-commit error that does not carry one yet
    pub(crate) fn with_commit(self, sha: &str) -> Self {
        match self {
            Self::MalformedCommit {
                commit: None,
                field,
                detail,
            } => Self::MalformedCommit {
                commit: Some(sha.to_string()),
                field,
                detail,
            },
            Self::JsonRepairFailure {
                commit: None,
                token,
                message,
            } => Self::JsonRepairFailure {
                commit: Some(sha.to_string()),
                token,
                message,
            },
            other => other,
        }
    }

    pub(crate) fn unavailable(kind: SourceKind, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_kind: kind,
            message: message.into(),
        }
    }

    /// Convert error to the process exit code:
    /// - 1: Source unavailable / IO error
    /// - 2: Malformed commit metadata
    /// - 3: Vote journal repair failure
    /// - 4: Invalid token or configuration
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::SourceUnavailable { .. } => ExitCode::from(1),
            Self::Io(_) => ExitCode::from(1),
            Self::MalformedCommit { .. } => ExitCode::from(2),
            Self::JsonRepairFailure { .. } => ExitCode::from(3),
            Self::InvalidToken { .. } => ExitCode::from(4),
            Self::Config { .. } => ExitCode::from(4),
        }
    }
}

/// Result type alias for pivote-engine operations
pub type Result<T> = std::result::Result<T, PipelineError>;
