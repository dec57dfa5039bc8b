//! Commit header extraction: Author, commit SHA and Date

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PipelineError, Result};
use crate::schema::CommitMeta;

/// Date layout printed by `git log` (RFC 2822 ordering, e.g.
/// `Mon Jan 2 15:04:05 2006 -0700`)
pub const GIT_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y %z";

static AUTHOR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Author[: \t]*(.*?)[ \t\r]*$").expect("author regex"));

static DATE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Date[: \t]*(.*?)[ \t\r]*$").expect("date regex"));

/// The SHA opens the fragment, optionally behind the `commit` keyword when
/// the fragment was not produced by the segmenter.
static COMMIT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A\s*(?:commit\b)?[: \t]*(\S*)").expect("commit regex"));

/// Recover the commit header of one fragment.
///
/// The SHA is read first so that errors about the other fields can name
/// the offending commit.
pub fn extract_meta(fragment: &str) -> Result<CommitMeta> {
    let commit_sha = extract_commit_sha(fragment)?;
    let author = extract_author(fragment).map_err(|e| e.with_commit(&commit_sha))?;
    let date = extract_date(fragment).map_err(|e| e.with_commit(&commit_sha))?;

    Ok(CommitMeta {
        author,
        commit_sha,
        date,
    })
}

pub fn extract_commit_sha(fragment: &str) -> Result<String> {
    let sha = COMMIT_LINE
        .captures(fragment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();

    if sha.is_empty() {
        return Err(malformed(None, "CommitSHA", "no commit line".to_string()));
    }
    if !sha.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed(None, "CommitSHA", format!("{:?} is not hex", sha)));
    }

    Ok(sha.to_string())
}

pub fn extract_author(fragment: &str) -> Result<String> {
    capture_line(&AUTHOR_LINE, fragment)
        .map(str::to_string)
        .ok_or_else(|| malformed(None, "Author", "no Author line".to_string()))
}

pub fn extract_date(fragment: &str) -> Result<DateTime<Utc>> {
    let raw = capture_line(&DATE_LINE, fragment)
        .ok_or_else(|| malformed(None, "Date", "no Date line".to_string()))?;
    parse_commit_date(raw)
}

/// Parse a commit timestamp.
///
/// The git text layout is tried first; RFC 2822 and RFC 3339 are accepted
/// as well since REST and library sources report dates in those forms.
pub fn parse_commit_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    DateTime::parse_from_str(raw, GIT_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| malformed(None, "Date", format!("{:?}: {}", raw, e)))
}

/// Format a timestamp the way `git log` prints it
pub fn format_git_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    // git does not pad the day of month
    date.format("%a %b %-d %H:%M:%S %Y %z").to_string()
}

fn capture_line<'a>(re: &Regex, fragment: &'a str) -> Option<&'a str> {
    re.captures(fragment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|value| !value.is_empty())
}

fn malformed(commit: Option<String>, field: &'static str, detail: String) -> PipelineError {
    PipelineError::MalformedCommit {
        commit,
        field,
        detail,
    }
}
