//! Command modules for the pivote CLI
//!
//! Each command module implements a single top-level command:
//! - `votes` - query the configured source
//! - `watch` - run the refresh loop
//! - `parse` - run the pipeline over a saved log dump
//!
//! All command handlers take their respective `Args` struct from `cli.rs`
//! and a shared `CommandContext` for output format, verbosity and the
//! loaded configuration.

pub mod parse;
pub mod votes;
pub mod watch;

pub use parse::run_parse;
pub use votes::run_votes;
pub use watch::run_watch;

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{OutputFormat, ScopeArgs};
use crate::config::EngineConfig;
use crate::error::{PipelineError, Result};
use crate::parsing::QueryReport;
use crate::schema::{Choice, History, ProposalToken, ScopeFilter};

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Output format (text or json)
    pub format: OutputFormat,
    /// Show verbose output
    pub verbose: bool,
    /// Loaded configuration with CLI overrides applied
    pub config: EngineConfig,
}

impl CommandContext {
    pub fn new(format: OutputFormat, verbose: bool, config: EngineConfig) -> Self {
        Self {
            format,
            verbose,
            config,
        }
    }
}

/// Build the query scope from command line arguments
pub fn scope_from_args(args: &ScopeArgs) -> Result<ScopeFilter> {
    let mut scope = match &args.token {
        Some(raw) => ScopeFilter::for_token(ProposalToken::parse(raw)?),
        None => ScopeFilter::any(),
    };

    if let Some(raw) = &args.since {
        let since = DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| PipelineError::Config {
            message: format!("--since expects an RFC 3339 timestamp, got {:?}: {}", raw, e),
        })?;
        scope = scope.since(since.with_timezone(&Utc));
    }

    if args.strict {
        scope = scope.strict();
    }

    Ok(scope)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    histories: &'a [History],
    failures: Vec<JsonFailure>,
}

#[derive(Serialize)]
struct JsonFailure {
    stage: String,
    commit: Option<String>,
    message: String,
}

/// Render a query report in the requested format
pub fn render_report(report: &QueryReport, ctx: &CommandContext) -> Result<String> {
    match ctx.format {
        OutputFormat::Json => {
            let json = JsonReport {
                histories: &report.histories,
                failures: report
                    .failures
                    .iter()
                    .map(|e| JsonFailure {
                        stage: e.stage().to_string(),
                        commit: e.commit().map(str::to_string),
                        message: e.to_string(),
                    })
                    .collect(),
            };
            let mut out = serde_json::to_string_pretty(&json).map_err(|e| PipelineError::Config {
                message: format!("JSON serialization failed: {}", e),
            })?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Text => Ok(render_text(report, ctx.verbose)),
    }
}

fn render_text(report: &QueryReport, verbose: bool) -> String {
    let mut out = String::new();

    for history in &report.histories {
        let _ = writeln!(
            out,
            "commit {}  {}  {}",
            history.commit_sha,
            history.date.to_rfc3339(),
            history.author
        );
        for file in &history.patch {
            let (yes, no, unknown) = tally(file.votes.iter().map(|v| v.choice));
            let _ = writeln!(
                out,
                "  {}  yes={} no={} unknown={}",
                file.token, yes, no, unknown
            );
            if verbose {
                for vote in &file.votes {
                    let _ = writeln!(out, "    {}  {}", vote.ticket, vote.choice);
                }
            }
        }
    }

    let _ = writeln!(
        out,
        "{} commits, {} votes",
        report.histories.len(),
        report.vote_count()
    );

    for failure in &report.failures {
        let _ = writeln!(out, "skipped: {}", failure);
    }

    out
}

fn tally(choices: impl Iterator<Item = Choice>) -> (usize, usize, usize) {
    choices.fold((0, 0, 0), |(yes, no, unknown), choice| match choice {
        Choice::Yes => (yes + 1, no, unknown),
        Choice::No => (yes, no + 1, unknown),
        Choice::Unknown => (yes, no, unknown + 1),
    })
}
