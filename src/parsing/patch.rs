//! Per-file diff sections and the vote signature test

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{ProposalToken, ScopeFilter, TOKEN_LEN};

/// Header that opens every file section of a commit patch
pub const FILE_DIFF_MARKER: &str = "diff --git a";

/// Prefix of a cast vote payload, directly followed by the token
pub const CASTVOTE_PREFIX: &str = r#"{"castvote":{"token":""#;

static TOKEN_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""token":"([A-Za-z0-9]{64})""#).expect("token field regex")
});

/// A file section whose journal carries votes in scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSection<'a> {
    /// Token read from the section itself, not from the scope
    pub token: ProposalToken,
    pub text: &'a str,
}

/// Split a commit fragment into per-file diff sections.
///
/// The text before the first file header (commit header and message) is
/// kept as a section of its own; it never carries a vote signature.
pub fn split_sections(fragment: &str) -> Vec<&str> {
    fragment.split(FILE_DIFF_MARKER).collect()
}

/// Whether `text` contains a cast vote for a token in scope.
///
/// With a scoped token the token must match exactly; otherwise any
/// 64-character alphanumeric token is accepted.
pub fn has_vote_signature(text: &str, scope: &ScopeFilter) -> bool {
    text.match_indices(CASTVOTE_PREFIX).any(|(idx, prefix)| {
        let rest = &text[idx + prefix.len()..];
        match &scope.token {
            Some(token) => rest
                .strip_prefix(token.as_str())
                .is_some_and(|tail| tail.starts_with("\",")),
            None => is_token_then_comma(rest),
        }
    })
}

fn is_token_then_comma(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() > TOKEN_LEN + 1
        && bytes[..TOKEN_LEN].iter().all(u8::is_ascii_alphanumeric)
        && &bytes[TOKEN_LEN..TOKEN_LEN + 2] == b"\","
}

/// Read the first proposal token named in `text`
pub fn extract_token(text: &str) -> Option<ProposalToken> {
    TOKEN_FIELD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ProposalToken::parse(m.as_str()).ok())
}

/// Keep only the sections that carry votes in scope, labelled with the
/// token they actually name.
pub fn scan_sections<'a>(fragment: &'a str, scope: &ScopeFilter) -> Vec<VoteSection<'a>> {
    split_sections(fragment)
        .into_iter()
        .filter_map(|text| vote_section(text, scope))
        .collect()
}

/// Classify one already isolated section (REST sources deliver files
/// one by one).
pub fn vote_section<'a>(text: &'a str, scope: &ScopeFilter) -> Option<VoteSection<'a>> {
    if !has_vote_signature(text, scope) {
        return None;
    }

    let token = match &scope.token {
        Some(token) => token.clone(),
        None => extract_token(text)?,
    };

    Some(VoteSection { token, text })
}
