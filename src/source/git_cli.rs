//! Source backed by the `git` binary and a local clone

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::error::Result;
use crate::git;
use crate::schema::ScopeFilter;

use super::{SourceAdapter, SourceKind, SourceUnit};

pub struct GitCliSource {
    repo_url: String,
    clone_path: PathBuf,
    timeout: Option<Duration>,
    version_checked: bool,
}

impl GitCliSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            repo_url: config.repo_url(),
            clone_path: config.clone_path(),
            timeout: config.command_timeout(),
            version_checked: false,
        }
    }

    pub fn clone_path(&self) -> &PathBuf {
        &self.clone_path
    }

    fn fresh_clone(&self) -> Result<()> {
        if self.clone_path.exists() {
            fs::remove_dir_all(&self.clone_path)?;
        }
        if let Some(parent) = self.clone_path.parent() {
            fs::create_dir_all(parent)?;
        }
        git::clone_repo(&self.repo_url, &self.clone_path, self.timeout)
    }

    /// Whether the existing clone points at the configured repository
    fn remote_matches(&self) -> bool {
        git::get_remote_url(&self.clone_path)
            .map(|url| same_remote(&url, &self.repo_url))
            .unwrap_or(false)
    }
}

impl SourceAdapter for GitCliSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cli
    }

    fn prepare(&mut self) -> Result<()> {
        if !self.version_checked {
            let version = git::check_git_version()?;
            tracing::debug!(%version, "git version ok");
            self.version_checked = true;
        }

        if !git::is_git_repo(&self.clone_path) {
            return self.fresh_clone();
        }

        if !self.remote_matches() {
            tracing::warn!(
                path = %self.clone_path.display(),
                "clone points at a different remote, cloning again"
            );
            return self.fresh_clone();
        }

        if let Err(e) = git::pull_changes(&self.clone_path, self.timeout) {
            tracing::warn!("pull failed, cloning again: {}", e);
            return self.fresh_clone();
        }

        Ok(())
    }

    fn fetch(&mut self, scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        let blob = git::read_patch_log(&self.clone_path, scope, self.timeout)?;
        Ok(vec![SourceUnit::Text(blob)])
    }
}

/// Compare remote URLs ignoring a trailing `.git` and slash
fn same_remote(a: &str, b: &str) -> bool {
    fn canonical(url: &str) -> &str {
        let url = url.trim().trim_end_matches('/');
        url.strip_suffix(".git").unwrap_or(url)
    }
    canonical(a).eq_ignore_ascii_case(canonical(b))
}
