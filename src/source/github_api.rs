//! Source backed by the GitHub REST API
//!
//! Lists the commits touching a proposal directory page by page, keeps
//! those flushing vote journals, then fetches each one with its file
//! patches. Patches arrive as separate fields, so units are delivered
//! pre-segmented as [`CommitObject`]s.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::{PipelineError, Result};
use crate::schema::ScopeFilter;

use super::{CommitObject, FilePatch, SourceAdapter, SourceKind, SourceUnit, VOTES_COMMIT_MESSAGE};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Entry of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Deserialize)]
struct CommitListEntry {
    sha: String,
    #[serde(default)]
    commit: CommitDetail,
}

/// Body of `GET /repos/{owner}/{repo}/commits/{sha}`
#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    #[serde(default)]
    commit: CommitDetail,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Default, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    committer: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    filename: String,
    /// Absent for binary files and very large diffs
    #[serde(default)]
    patch: Option<String>,
}

/// GitHub's error body
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
    #[serde(default)]
    documentation_url: Option<String>,
}

pub struct GitHubApiSource {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    access_token: Option<String>,
    page_size: u32,
}

impl GitHubApiSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.command_timeout().unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.repo_owner.clone(),
            repo: config.repo_name.clone(),
            access_token: config.access_token.clone().filter(|t| !t.trim().is_empty()),
            page_size: config.page_size,
        })
    }

    /// URL of one page of the commit list for `scope`
    fn list_url(&self, scope: &ScopeFilter, page: u32) -> String {
        let mut url = format!(
            "{}/repos/{}/{}/commits?page={}&per_page={}",
            self.api_url, self.owner, self.repo, page, self.page_size
        );
        if let Some(token) = &scope.token {
            url.push_str(&format!("&path={}", token));
        }
        if let Some(since) = scope.since {
            url.push_str(&format!("&since={}", since.format("%Y-%m-%dT%H:%M:%SZ")));
        }
        url
    }

    fn commit_url(&self, sha: &str) -> String {
        format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_url, self.owner, self.repo, sha
        )
    }

    fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("pivote-engine/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json");

        if let Some(token) = &self.access_token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request
            .send()
            .map_err(|e| unavailable(format!("GET {} failed: {}", url, e)))?;
        decode_response(url, response)
    }

    /// SHAs of vote flush commits for `scope`, newest first as listed
    fn list_vote_commits(&self, scope: &ScopeFilter) -> Result<Vec<String>> {
        let mut shas = Vec::new();
        let mut page = 1;

        loop {
            tracing::debug!(page, page_size = self.page_size, "listing commits");
            let entries: Vec<CommitListEntry> = self.get(&self.list_url(scope, page))?;
            let fetched = entries.len();

            shas.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.commit.message.contains(VOTES_COMMIT_MESSAGE))
                    .map(|entry| entry.sha),
            );

            if fetched < self.page_size as usize {
                return Ok(shas);
            }
            page += 1;
        }
    }

    fn fetch_commit(&self, sha: &str) -> Result<CommitObject> {
        let raw: RawCommit = self.get(&self.commit_url(sha))?;
        Ok(into_commit_object(raw))
    }
}

impl SourceAdapter for GitHubApiSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn prepare(&mut self) -> Result<()> {
        if self.access_token.is_none() {
            tracing::warn!("no GitHub access token configured, requests are rate limited to 60 per hour");
        }
        Ok(())
    }

    fn fetch(&mut self, scope: &ScopeFilter) -> Result<Vec<SourceUnit>> {
        let mut shas = self.list_vote_commits(scope)?;
        shas.reverse();

        tracing::info!(commits = shas.len(), "fetching vote commits");
        shas.iter()
            .map(|sha| self.fetch_commit(sha).map(SourceUnit::Commit))
            .collect()
    }
}

fn into_commit_object(raw: RawCommit) -> CommitObject {
    let (author, date) = match raw.commit.committer {
        Some(sig) => (format!("{} <{}>", sig.name, sig.email), sig.date),
        None => (String::new(), String::new()),
    };

    CommitObject {
        sha: raw.sha,
        author,
        date,
        files: raw
            .files
            .into_iter()
            .filter_map(|file| {
                let patch = file.patch?;
                Some(FilePatch {
                    filename: file.filename,
                    patch,
                })
            })
            .collect(),
    }
}

fn decode_response<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| unavailable(format!("reading {} failed: {}", url, e)))?;

    if !status.is_success() {
        return Err(unavailable(describe_error(status.as_u16(), &body)));
    }

    serde_json::from_str(&body).map_err(|e| match describe_api_error(&body) {
        Some(message) => unavailable(message),
        None => unavailable(format!("unexpected response from {}: {}", url, e)),
    })
}

fn describe_error(status: u16, body: &str) -> String {
    match describe_api_error(body) {
        Some(message) => format!("HTTP {}: {}", status, message),
        None => format!("HTTP {}", status),
    }
}

fn describe_api_error(body: &str) -> Option<String> {
    let err: ErrorResponse = serde_json::from_str(body).ok()?;
    Some(match err.documentation_url {
        Some(doc) => format!("{} ({})", err.message, doc),
        None => err.message,
    })
}

fn unavailable(message: String) -> PipelineError {
    PipelineError::unavailable(SourceKind::Api, message)
}
