//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::source::SourceKind;

/// Politeia vote history reader
#[derive(Parser, Debug)]
#[command(name = "pivote")]
#[command(about = "Reads Politeia proposal votes from the git history of the proposals repository")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: <config dir>/pivote/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured source (cli, api, library)
    #[arg(long, value_name = "KIND", global = true, value_parser = parse_source_kind)]
    pub source: Option<SourceKind>,

    /// GitHub access token for the api source
    #[arg(long, env = "PIVOTE_GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,
}

/// Available subcommands for pivote
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the vote history of one proposal, or of all proposals
    #[command(visible_alias = "v")]
    Votes(VotesArgs),

    /// Refresh periodically and print one JSON line per refresh
    Watch(WatchArgs),

    /// Parse a saved `git log -p` dump without touching any source
    Parse(ParseArgs),
}

/// Scope options shared by `votes` and `parse`
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// 64 character proposal token; all proposals when omitted
    #[arg(value_name = "TOKEN")]
    pub token: Option<String>,

    /// Only commits after this RFC 3339 timestamp
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Fail on the first malformed commit instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct VotesArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between refreshes (default: refresh.interval_secs)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Exit after this many refreshes
    #[arg(long, value_name = "N")]
    pub max_refreshes: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// File holding `git log -p` output
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default for terminal)
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// JSON - standard JSON output for machine parsing
    Json,
}

fn parse_source_kind(raw: &str) -> Result<SourceKind, String> {
    raw.parse().map_err(|e: crate::error::PipelineError| e.to_string())
}
