//! Source backed by libgit2
//!
//! Walks the history of a local clone in-process and renders each commit
//! as `git log -p` text, so the output goes through the same pipeline as
//! the git binary's.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{BranchType, Commit, DiffFormat, DiffOptions, Oid, Repository, Sort};

use crate::config::SourceConfig;
use crate::error::{PipelineError, Result};
use crate::parsing::metadata::format_git_date;
use crate::schema::ScopeFilter;

use super::{SourceAdapter, SourceKind, SourceUnit};

pub struct GitLibSource {
    repo_url: String,
    clone_path: PathBuf,
    repo: Option<Repository>,
}

impl GitLibSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            repo_url: config.repo_url(),
            clone_path: config.clone_path(),
            repo: None,
        }
    }

    fn open_or_clone(&self) -> Result<Repository> {
        if self.clone_path.join(".git").exists() {
            return Repository::open(&self.clone_path).map_err(git_error);
        }

        if let Some(parent) = self.clone_path.parent() {
            fs::create_dir_all(parent)?;
        }
        tracing::info!(url = %self.repo_url, "cloning proposals repository");
        Repository::clone(&self.repo_url, &self.clone_path).map_err(git_error)
    }
}

impl SourceAdapter for GitLibSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Library
    }

    fn prepare(&mut self) -> Result<()> {
        let repo = self.open_or_clone()?;

        // A failed fetch leaves the previous history readable
        match repo.find_remote("origin") {
            Ok(mut remote) => {
                if let Err(e) = remote.fetch(&[] as &[&str], None, None) {
                    tracing::warn!("fetch from origin failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("no origin remote: {}", e),
        }

        self.repo = Some(repo);
        Ok(())
    }

    fn fetch(&mut self, scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        let repo = match &self.repo {
            Some(repo) => repo,
            None => {
                return Err(PipelineError::unavailable(
                    SourceKind::Library,
                    "repository not prepared",
                ))
            }
        };

        let blob = render_log(repo, scope).map_err(git_error)?;
        Ok(vec![SourceUnit::Text(blob)])
    }
}

/// Tip to walk from: the fetched upstream of the checked out branch, else
/// `origin/HEAD`, else `HEAD` itself
fn walk_start(repo: &Repository) -> std::result::Result<Oid, git2::Error> {
    if let Some(oid) = upstream_tip(repo) {
        return Ok(oid);
    }
    let tip = repo
        .revparse_single("refs/remotes/origin/HEAD")
        .or_else(|_| repo.revparse_single("HEAD"))?;
    Ok(tip.peel_to_commit()?.id())
}

fn upstream_tip(repo: &Repository) -> Option<Oid> {
    let head = repo.head().ok()?;
    let branch = repo.find_branch(head.shorthand()?, BranchType::Local).ok()?;
    let upstream = branch.upstream().ok()?;
    upstream.get().target()
}

/// Render the history in scope oldest first, like `git log --reverse -p`
fn render_log(repo: &Repository, scope: &ScopeFilter) -> std::result::Result<String, git2::Error> {
    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push(walk_start(repo)?)?;

    let mut rendered = Vec::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        let date = commit_date(&commit);

        if scope.since.is_some_and(|since| date.with_timezone(&Utc) < since) {
            break;
        }

        if let Some(text) = render_commit(repo, &commit, &date, scope)? {
            rendered.push(text);
        }
    }

    rendered.reverse();
    Ok(rendered.concat())
}

fn commit_date(commit: &Commit<'_>) -> DateTime<FixedOffset> {
    let when = commit.committer().when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
        .unwrap_or_else(|| Utc.fix());
    DateTime::from_timestamp(when.seconds(), 0)
        .unwrap_or_default()
        .with_timezone(&offset)
}

/// Header and patch of one commit, or `None` when no file in scope changed
fn render_commit(
    repo: &Repository,
    commit: &Commit<'_>,
    date: &DateTime<FixedOffset>,
    scope: &ScopeFilter,
) -> std::result::Result<Option<String>, git2::Error> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parent_count() {
        0 => None,
        _ => Some(commit.parent(0)?.tree()?),
    };

    let mut opts = DiffOptions::new();
    if let Some(token) = &scope.token {
        opts.pathspec(token.as_str());
    }
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

    if scope.token.is_some() && diff.deltas().len() == 0 {
        return Ok(None);
    }

    let mut text = format!(
        "commit {}\nAuthor: {}\nDate:   {}\n\n",
        commit.id(),
        commit.author(),
        format_git_date(date)
    );
    for line in commit.message().unwrap_or_default().lines() {
        text.push_str("    ");
        text.push_str(line);
        text.push('\n');
    }
    text.push('\n');

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            text.push(line.origin());
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;

    Ok(Some(text))
}

fn git_error(e: git2::Error) -> PipelineError {
    PipelineError::unavailable(SourceKind::Library, e.message().to_string())
}
