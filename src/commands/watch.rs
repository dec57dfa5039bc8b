//! `pivote watch`

use std::time::Duration;

use crate::cli::WatchArgs;
use crate::coordinator::{
    emit_event, init_event_emitter, RefreshConfig, RefreshCoordinator, RefreshFailedEvent,
    WatchStatusEvent,
};
use crate::error::{PipelineError, Result};
use crate::source::{Source, SourceAdapter};

use super::CommandContext;

/// Refresh immediately, then on every interval, printing events to stdout
pub fn run_watch(args: &WatchArgs, ctx: &CommandContext) -> Result<String> {
    let mut config = RefreshConfig::from(&ctx.config.refresh);
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(PipelineError::Config {
                message: "--interval must be positive".to_string(),
            });
        }
        config.interval = Duration::from_secs(secs);
    }

    let source = Source::from_config(&ctx.config.source)?;
    watch(source, config, args.max_refreshes)?;
    Ok(String::new())
}

/// Drive the refresh loop until `max_refreshes` successful refreshes were
/// observed, or forever when `None`
pub fn watch<S: SourceAdapter + 'static>(
    source: S,
    config: RefreshConfig,
    max_refreshes: Option<usize>,
) -> Result<()> {
    init_event_emitter(true);

    let interval_secs = config.interval.as_secs();
    let coordinator = RefreshCoordinator::with_config(source, config);
    let kind = coordinator.source_kind();
    let notifications = coordinator.subscribe();

    emit_event(&WatchStatusEvent::started(kind, interval_secs));

    // Events for this one are emitted by the coordinator itself
    let mut seen = 0;
    match coordinator.refresh() {
        Ok(_) => {
            notifications.try_take();
            seen += 1;
        }
        Err(e) => {
            tracing::error!("Initial refresh failed: {}", e);
            emit_event(&RefreshFailedEvent::from_error(kind, &e));
        }
    }

    let handle = coordinator.start()?;
    while max_refreshes.map_or(true, |max| seen < max) {
        if notifications.wait_timeout(coordinator.config().interval) {
            seen += 1;
        }
    }
    handle.stop();

    emit_event(&WatchStatusEvent::stopped(kind, interval_secs));
    Ok(())
}
