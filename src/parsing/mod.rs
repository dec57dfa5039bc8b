//! Raw commit text to vote records
//!
//! ```text
//! blob ─ segment ─┬─ metadata ─────────────────────────────┐
//!                 └─ patch sections ─ journal repair ─ decode ─ assemble ─ History
//! ```
//!
//! Every function here is pure over in-memory text and takes the query
//! scope explicitly. Failures are reported per commit so callers choose
//! between lenient and strict handling (see [`collect`]).

pub mod assemble;
pub mod decode;
pub mod journal;
pub mod metadata;
pub mod patch;
pub mod segment;

pub use assemble::{assemble, group_by_token};
pub use decode::decode_votes;
pub use journal::{repair, repair_section, JournalAction, JournalText, SourceShape};
pub use metadata::{extract_meta, parse_commit_date, GIT_DATE_FORMAT};
pub use patch::{has_vote_signature, scan_sections, VoteSection};
pub use segment::segment;

use crate::error::{PipelineError, Result};
use crate::schema::{CommitMeta, History, ParseMode, ProposalToken, ScopeFilter, VoteRecord};

/// One raw unit handed over by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUnit {
    /// `git log -p` text holding any number of commits
    Text(String),
    /// A commit already split into header fields and file patches
    Commit(CommitObject),
}

/// Pre-segmented commit as delivered by the REST API
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitObject {
    pub sha: String,
    /// "Name <email>"
    pub author: String,
    /// RFC 3339 or git formatted timestamp
    pub date: String,
    pub files: Vec<FilePatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePatch {
    pub filename: String,
    pub patch: String,
}

/// Result of one query in lenient mode
#[derive(Debug, Default)]
pub struct QueryReport {
    /// Commits that parsed, in source order
    pub histories: Vec<History>,
    /// Commits that matched the vote signature but failed to parse
    pub failures: Vec<PipelineError>,
}

impl QueryReport {
    pub fn vote_count(&self) -> usize {
        self.histories.iter().map(History::vote_count).sum()
    }
}

/// Run every unit through the pipeline, preserving source order
pub fn parse_units(units: &[SourceUnit], scope: &ScopeFilter) -> Vec<Result<History>> {
    let mut results = Vec::new();
    for unit in units {
        match unit {
            SourceUnit::Text(blob) => results.extend(parse_blob(blob, scope)),
            SourceUnit::Commit(commit) => results.extend(parse_commit_object(commit, scope)),
        }
    }
    results
}

/// Segment a `git log -p` blob and parse every fragment
pub fn parse_blob(blob: &str, scope: &ScopeFilter) -> Vec<Result<History>> {
    segment(blob)
        .into_iter()
        .filter_map(|fragment| parse_fragment(fragment, scope))
        .collect()
}

/// Parse one commit fragment.
///
/// Returns `None` when the fragment carries no vote in scope or when the
/// assembled record is dropped.
pub fn parse_fragment(fragment: &str, scope: &ScopeFilter) -> Option<Result<History>> {
    if !has_vote_signature(fragment, scope) {
        return None;
    }

    let meta = match extract_meta(fragment) {
        Ok(meta) => meta,
        Err(e) => return Some(Err(e)),
    };

    let sections = scan_sections(fragment, scope);
    let texts = sections
        .into_iter()
        .map(|section| (section.token, journal::normalize(section.text, SourceShape::CliText)));

    decode_and_assemble(meta, texts, scope).transpose()
}

/// Parse a commit delivered as separate header fields and file patches
pub fn parse_commit_object(commit: &CommitObject, scope: &ScopeFilter) -> Option<Result<History>> {
    let normalized: Vec<String> = commit
        .files
        .iter()
        .map(|file| journal::normalize(&file.patch, SourceShape::ApiPatch))
        .collect();

    let sections: Vec<(ProposalToken, String)> = normalized
        .into_iter()
        .filter_map(|text| {
            let token = patch::vote_section(&text, scope)?.token;
            Some((token, text))
        })
        .collect();

    if sections.is_empty() {
        return None;
    }

    let meta = match commit_object_meta(commit) {
        Ok(meta) => meta,
        Err(e) => return Some(Err(e)),
    };

    decode_and_assemble(meta, sections.into_iter(), scope).transpose()
}

fn commit_object_meta(commit: &CommitObject) -> Result<CommitMeta> {
    let missing = |field: &'static str| PipelineError::MalformedCommit {
        commit: (!commit.sha.is_empty()).then(|| commit.sha.clone()),
        field,
        detail: "empty field in commit object".to_string(),
    };

    if commit.sha.trim().is_empty() {
        return Err(missing("CommitSHA"));
    }
    if commit.author.trim().is_empty() {
        return Err(missing("Author"));
    }
    if commit.date.trim().is_empty() {
        return Err(missing("Date"));
    }

    let date = parse_commit_date(&commit.date).map_err(|e| e.with_commit(&commit.sha))?;

    Ok(CommitMeta {
        author: commit.author.trim().to_string(),
        commit_sha: commit.sha.trim().to_string(),
        date,
    })
}

/// Repair and decode every section, then assemble the commit record.
/// Sections are already normalized for their source shape.
fn decode_and_assemble(
    meta: CommitMeta,
    sections: impl Iterator<Item = (ProposalToken, String)>,
    scope: &ScopeFilter,
) -> Result<Option<History>> {
    let mut decoded: Vec<(ProposalToken, Vec<VoteRecord>)> = Vec::new();

    for (token, text) in sections {
        let array = match repair_section(&text, SourceShape::CliText) {
            JournalText::Array(array) => array,
            JournalText::NoVotes => continue,
        };

        let votes = decode_votes(&array).map_err(|e| PipelineError::JsonRepairFailure {
            commit: Some(meta.commit_sha.clone()),
            token: token.to_string(),
            message: e.to_string(),
        })?;
        decoded.push((token, votes));
    }

    Ok(assemble(meta, decoded, scope))
}

/// Fold per-commit results according to the parse mode.
///
/// Lenient mode keeps every parsed commit and lists the failures; strict
/// mode fails the whole batch on the first failure.
pub fn collect(results: Vec<Result<History>>, mode: ParseMode) -> Result<QueryReport> {
    let mut report = QueryReport::default();

    for result in results {
        match result {
            Ok(history) => report.histories.push(history),
            Err(e) if mode == ParseMode::Strict => return Err(e),
            Err(e) => {
                tracing::warn!(stage = %e.stage(), commit = ?e.commit(), "skipping commit: {}", e);
                report.failures.push(e);
            }
        }
    }

    Ok(report)
}
