//! Reading patch history

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::schema::ScopeFilter;
use super::git_command_with_timeout;

/// Arguments for `git log` producing oldest-first patch text for `scope`.
///
/// The output shape is pinned so user or system gitconfig (`diff.noprefix`,
/// `format.pretty`, `log.showSignature`, `log.decorate`, external diff
/// drivers) cannot change the headers the parser splits on.
pub fn log_patch_args(scope: &ScopeFilter) -> Vec<String> {
    let mut args: Vec<String> = [
        "log",
        "--reverse",
        "-p",
        "--no-color",
        "--format=medium",
        "--date=default",
        "--no-decorate",
        "--no-show-signature",
        "--no-ext-diff",
        "--no-textconv",
        "--src-prefix=a/",
        "--dst-prefix=b/",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    if let Some(since) = scope.since {
        args.push(format!("--since={}", since_arg(since)));
    }

    // Journals live under a directory named after the proposal token
    if let Some(token) = &scope.token {
        args.push("--".to_string());
        args.push(token.to_string());
    }

    args
}

/// Read the patch log of the clone at `dir`
pub fn read_patch_log(dir: &Path, scope: &ScopeFilter, timeout: Option<Duration>) -> Result<String> {
    let args = log_patch_args(scope);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    git_command_with_timeout(&args, Some(dir), timeout)
}

// git's date parser reads ISO 8601 reliably across versions
fn since_arg(since: DateTime<Utc>) -> String {
    since.format("%Y-%m-%d %H:%M:%S %z").to_string()
}
