//! `pivote parse`

use std::fs;

use crate::cli::ParseArgs;
use crate::error::Result;
use crate::parsing::{collect, parse_blob};

use super::{render_report, scope_from_args, CommandContext};

/// Run the pipeline over a saved `git log -p` dump
pub fn run_parse(args: &ParseArgs, ctx: &CommandContext) -> Result<String> {
    let scope = scope_from_args(&args.scope)?;
    let blob = fs::read_to_string(&args.file)?;

    if ctx.verbose {
        eprintln!("Read {} bytes from {}", blob.len(), args.file.display());
    }

    let report = collect(parse_blob(&blob, &scope), scope.mode)?;
    render_report(&report, ctx)
}
