//! The `serve` command

use std::io;

use anyhow::{Context, Result};

use super::logging;
use super::output::Output;
use crate::config::Config;
use crate::plugin::{self, Bridge, HookContext, HookEvent, HookOutcome, Peer};

/// Runs the bridge on stdin/stdout until the host goes away
pub fn run(config: &Config, output: &Output) -> Result<()> {
    let _guard = logging::init(&config.log, output.is_verbose())?;
    output.verbose_ctx(
        "serve",
        &format!("Serving with {} cache", config.cache.mode.as_str()),
    );

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        cache = config.cache.mode.as_str(),
        "plugin bridge starting"
    );

    let bridge = Bridge::with_cache_mode(Peer::stdout(), config.cache.mode);
    bridge.set_handle_fn(trace_event);

    let stdin = io::stdin();
    plugin::serve(&bridge, stdin.lock()).context("Lost connection to host")?;

    let views = bridge.with_views(|views| views.len());
    tracing::info!(views, "plugin bridge stopped");
    Ok(())
}

fn trace_event(ctx: &HookContext<'_>, event: &HookEvent<'_>) -> HookOutcome {
    match event {
        HookEvent::Update(update) => {
            let synced = ctx
                .view(&update.view_id)
                .is_some_and(|view| view.cache.text().is_some());
            tracing::trace!(view_id = %update.view_id, rev = update.rev, synced, "view updated");
        }
        other => {
            tracing::trace!(method = other.method(), views = ctx.views().len(), "lifecycle event");
        }
    }
    HookOutcome::pass()
}
