//! Grouping decoded votes into commit level records

use crate::schema::{CommitMeta, FileVotes, History, ProposalToken, ScopeFilter, VoteRecord};

/// Group `(token, votes)` pairs of one commit, in encounter order.
///
/// Votes for a token seen twice in the same commit are appended to the
/// first group for that token.
pub fn group_by_token(decoded: Vec<(ProposalToken, Vec<VoteRecord>)>) -> Vec<FileVotes> {
    let mut groups: Vec<FileVotes> = Vec::new();

    for (token, votes) in decoded {
        if votes.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|group| group.token == token) {
            Some(group) => group.votes.extend(votes),
            None => groups.push(FileVotes { token, votes }),
        }
    }

    groups
}

/// Build the record for one commit, or `None` when it must not be
/// surfaced: no votes, blank author or SHA, or a date equal to the
/// since-cutoff.
pub fn assemble(
    meta: CommitMeta,
    decoded: Vec<(ProposalToken, Vec<VoteRecord>)>,
    scope: &ScopeFilter,
) -> Option<History> {
    let patch = group_by_token(decoded);

    if patch.is_empty() {
        return None;
    }
    if meta.author.trim().is_empty() || meta.commit_sha.trim().is_empty() {
        return None;
    }
    if scope.since.is_some_and(|cutoff| cutoff == meta.date) {
        tracing::debug!(commit = %meta.commit_sha, "dropping commit at since-cutoff");
        return None;
    }

    Some(History::new(meta, patch))
}
