//! Synthetic vote flush commits

use chrono::{DateTime, Utc};
use pivote_engine::{CommitObject, FilePatch};

pub const T1: &str = "27f87171d98b7923a1bd2bee6affed929fa2d2a6e178b5c80a9971a92a5c7f50";
pub const T2: &str = "5431da8ff4eda8cdbf8f4f2e08566ffa573464b97ef6d6bae78e749f27800d3a";

pub const POLITEIA: &str = "Politeia <noreply@decred.org>";

/// 64 hex character ticket hash derived from `n`
pub fn ticket(n: u32) -> String {
    format!("{:064x}", 0x1e4e_075e_u64 * 1_000 + u64::from(n))
}

/// One journal entry, without the diff `+`
pub fn journal_line(action: &str, token: &str, ticket: &str, votebit: &str) -> String {
    format!(
        "{{\"version\":\"1\",\"action\":\"{}\"}}{{\"castvote\":{{\"token\":\"{}\",\"ticket\":\"{}\",\"votebit\":\"{}\",\"signature\":\"1f3bc5e9d0\"}},\"receipt\":\"96a7f1c4\"}}",
        action, token, ticket, votebit
    )
}

pub fn add(token: &str, ticket: &str, votebit: &str) -> String {
    journal_line("add", token, ticket, votebit)
}

#[derive(Debug, Clone)]
pub struct CommitFixture {
    pub sha: String,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// (token, added journal lines)
    pub files: Vec<(String, Vec<String>)>,
}

impl CommitFixture {
    pub fn new(sha: &str, date: &str) -> Self {
        Self {
            sha: sha.to_string(),
            author: Some(POLITEIA.to_string()),
            date: Some(date.parse().expect("fixture date")),
            files: Vec::new(),
        }
    }

    pub fn file(mut self, token: &str, lines: Vec<String>) -> Self {
        self.files.push((token.to_string(), lines));
        self
    }

    pub fn without_date(mut self) -> Self {
        self.date = None;
        self
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date.expect("fixture has a date")
    }

    /// The commit as printed by `git log -p`
    pub fn log_text(&self) -> String {
        let mut out = format!("commit {}\n", self.sha);
        if let Some(author) = &self.author {
            out.push_str(&format!("Author: {}\n", author));
        }
        if let Some(date) = self.date {
            out.push_str(&format!("Date:   {}\n", date.format("%a %b %-d %H:%M:%S %Y %z")));
        }
        out.push_str("\n    Flush vote journals.\n\n");

        for (token, lines) in &self.files {
            let path = journal_path(token);
            out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
            out.push_str("index 8b3a9d1..f02c6e4 100644\n");
            out.push_str(&format!("--- a/{}\n+++ b/{}\n", path, path));
            out.push_str(&format!("@@ -1,0 +1,{} @@\n", lines.len()));
            for line in lines {
                out.push('+');
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// The commit as returned by the REST commits endpoint
    pub fn api_object(&self) -> CommitObject {
        CommitObject {
            sha: self.sha.clone(),
            author: self.author.clone().unwrap_or_default(),
            date: self.date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            files: self
                .files
                .iter()
                .map(|(token, lines)| FilePatch {
                    filename: journal_path(token),
                    patch: format!(
                        "@@ -1,0 +1,{} @@\n{}",
                        lines.len(),
                        lines
                            .iter()
                            .map(|l| format!("+{}", l))
                            .collect::<Vec<_>>()
                            .join("\n")
                    ),
                })
                .collect(),
        }
    }
}

pub fn journal_path(token: &str) -> String {
    format!("{}/3/plugins/decred/ballot.journal", token)
}

/// Concatenate commits into one log blob
pub fn log_of(commits: &[CommitFixture]) -> String {
    commits.iter().map(CommitFixture::log_text).collect()
}
