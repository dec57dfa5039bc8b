//! `pivote votes`

use crate::cli::VotesArgs;
use crate::coordinator::{RefreshConfig, RefreshCoordinator};
use crate::error::Result;
use crate::source::Source;

use super::{render_report, scope_from_args, CommandContext};

/// Query the configured source once and render the result
pub fn run_votes(args: &VotesArgs, ctx: &CommandContext) -> Result<String> {
    let scope = scope_from_args(&args.scope)?;
    let source = Source::from_config(&ctx.config.source)?;
    let coordinator =
        RefreshCoordinator::with_config(source, RefreshConfig::from(&ctx.config.refresh));

    tracing::info!(
        source = %coordinator.source_kind(),
        token = scope.token.as_ref().map(|t| t.as_str()).unwrap_or("*"),
        "querying votes"
    );

    let report = coordinator.query(&scope)?;
    render_report(&report, ctx)
}
