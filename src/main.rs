//! pivote CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pivote_engine::cli::{Cli, Commands};
use pivote_engine::commands::{run_parse, run_votes, run_watch, CommandContext};
use pivote_engine::EngineConfig;

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> pivote_engine::Result<String> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(kind) = cli.source {
        config.source.kind = kind;
    }
    if let Some(token) = &cli.access_token {
        config.source.access_token = Some(token.clone());
    }

    init_tracing(&config, cli.verbose);

    let ctx = CommandContext::new(cli.format, cli.verbose, config);
    match &cli.command {
        Commands::Votes(args) => run_votes(args, &ctx),
        Commands::Watch(args) => run_watch(args, &ctx),
        Commands::Parse(args) => run_parse(args, &ctx),
    }
}

/// Log to stderr so stdout stays machine readable. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(config: &EngineConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pivote_engine={}", level)));

    // May fail if already initialized, which is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
