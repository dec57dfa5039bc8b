//! Where raw commit text comes from
//!
//! A source produces an ordered sequence of [`SourceUnit`]s: either one
//! `git log -p` blob to segment, or commits already split by the remote.
//! The mechanism is chosen once, when the engine is built.

mod git_cli;
#[cfg(feature = "embedded-git")]
mod git_lib;
mod github_api;

pub use git_cli::GitCliSource;
#[cfg(feature = "embedded-git")]
pub use git_lib::GitLibSource;
pub use github_api::GitHubApiSource;

pub use crate::parsing::{CommitObject, FilePatch, SourceUnit};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::error::{PipelineError, Result};
use crate::schema::ScopeFilter;

/// Message of the commits that flush vote journals into the repository
pub const VOTES_COMMIT_MESSAGE: &str = "Flush vote journals";

/// Directory name of the local clone inside the configured clone dir
pub const CLONE_DIR_NAME: &str = "prop-repo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The `git` binary on PATH
    #[default]
    Cli,
    /// The GitHub REST API
    Api,
    /// libgit2, linked in
    Library,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Cli => "cli",
            SourceKind::Api => "api",
            SourceKind::Library => "library",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "git" => Ok(SourceKind::Cli),
            "api" | "github" => Ok(SourceKind::Api),
            "library" | "lib" => Ok(SourceKind::Library),
            other => Err(PipelineError::Config {
                message: format!("unknown source kind '{}' (expected cli, api or library)", other),
            }),
        }
    }
}

/// Contract between the pipeline and a data source
pub trait SourceAdapter: Send {
    fn kind(&self) -> SourceKind;

    /// Bring local state up to date (clone, pull, credential checks).
    fn prepare(&mut self) -> Result<()>;

    /// Produce raw units for `scope`, oldest commit first.
    fn fetch(&mut self, scope: &ScopeFilter) -> Result<Vec<SourceUnit>>;
}

/// The configured source
pub enum Source {
    Cli(GitCliSource),
    Api(GitHubApiSource),
    #[cfg(feature = "embedded-git")]
    Library(GitLibSource),
}

impl Source {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        match config.kind {
            SourceKind::Cli => Ok(Source::Cli(GitCliSource::new(config))),
            SourceKind::Api => Ok(Source::Api(GitHubApiSource::new(config)?)),
            #[cfg(feature = "embedded-git")]
            SourceKind::Library => Ok(Source::Library(GitLibSource::new(config))),
            #[cfg(not(feature = "embedded-git"))]
            SourceKind::Library => Err(PipelineError::Config {
                message: "the library source requires the 'embedded-git' feature".to_string(),
            }),
        }
    }
}

impl SourceAdapter for Source {
    fn kind(&self) -> SourceKind {
        match self {
            Source::Cli(s) => s.kind(),
            Source::Api(s) => s.kind(),
            #[cfg(feature = "embedded-git")]
            Source::Library(s) => s.kind(),
        }
    }

    fn prepare(&mut self) -> Result<()> {
        match self {
            Source::Cli(s) => s.prepare(),
            Source::Api(s) => s.prepare(),
            #[cfg(feature = "embedded-git")]
            Source::Library(s) => s.prepare(),
        }
    }

    fn fetch(&mut self, scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        match self {
            Source::Cli(s) => s.fetch(scope),
            Source::Api(s) => s.fetch(scope),
            #[cfg(feature = "embedded-git")]
            Source::Library(s) => s.fetch(scope),
        }
    }
}

/// Source over units held in memory, for offline parsing and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    units: Vec<SourceUnit>,
}

impl StaticSource {
    pub fn new(units: Vec<SourceUnit>) -> Self {
        Self { units }
    }

    pub fn from_text(blob: impl Into<String>) -> Self {
        Self::new(vec![SourceUnit::Text(blob.into())])
    }
}

impl SourceAdapter for StaticSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cli
    }

    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn fetch(&mut self, _scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        Ok(self.units.clone())
    }
}
