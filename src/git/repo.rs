//! Local clone management

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::source::SourceKind;
use super::{git_command, git_command_optional, git_command_with_timeout};

/// Oldest git release accepting every flag of [`super::log_patch_args`]
/// (`--no-show-signature` arrived in 2.10)
pub const MIN_GIT_VERSION: GitVersion = GitVersion {
    major: 2,
    minor: 10,
    patch: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse the output of `git version`, e.g. "git version 2.39.2 (Apple Git-143)"
pub fn parse_git_version(output: &str) -> Option<GitVersion> {
    let raw = output.trim().strip_prefix("git version")?.split_whitespace().next()?;

    // Missing or vendor-suffixed components ("2.45.windows") count as zero
    let mut parts = raw.split('.').map(|part| {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u32>().unwrap_or(0)
    });

    Some(GitVersion {
        major: parts.next()?,
        minor: parts.next().unwrap_or(0),
        patch: parts.next().unwrap_or(0),
    })
}

/// Fail unless the installed git is at least [`MIN_GIT_VERSION`]
pub fn check_git_version() -> Result<GitVersion> {
    let output = git_command(&["version"], None)?;
    let version = parse_git_version(&output).ok_or_else(|| {
        PipelineError::unavailable(
            SourceKind::Cli,
            format!("unrecognized git version output: {}", output),
        )
    })?;

    if version < MIN_GIT_VERSION {
        return Err(PipelineError::unavailable(
            SourceKind::Cli,
            format!(
                "git {} is installed but at least {} is required",
                version, MIN_GIT_VERSION
            ),
        ));
    }

    Ok(version)
}

/// Check if `dir` is the top of a git work tree
pub fn is_git_repo(dir: &Path) -> bool {
    dir.join(".git").exists()
        && git_command_optional(&["rev-parse", "--is-inside-work-tree"], Some(dir))
            .map(|s| s == "true")
            .unwrap_or(false)
}

/// URL of the `origin` remote, if any
pub fn get_remote_url(dir: &Path) -> Option<String> {
    git_command_optional(&["config", "--get", "remote.origin.url"], Some(dir))
        .filter(|url| !url.is_empty())
}

/// Clone `url` into `target`, which must not exist yet
pub fn clone_repo(url: &str, target: &Path, timeout: Option<Duration>) -> Result<()> {
    let target_str = target.to_string_lossy();
    tracing::info!(url, target = %target_str, "cloning proposals repository");
    git_command_with_timeout(&["clone", "--quiet", url, &target_str], None, timeout)?;
    Ok(())
}

/// Fast-forward the current branch of `dir` from its upstream
pub fn pull_changes(dir: &Path, timeout: Option<Duration>) -> Result<()> {
    tracing::debug!(dir = %dir.display(), "pulling proposals repository");
    git_command_with_timeout(&["pull", "--quiet", "--ff-only"], Some(dir), timeout)?;
    Ok(())
}
