//! Logging setup
//!
//! Stdout carries the protocol, so log output goes to stderr or to a file,
//! always through a non-blocking writer.
//!
//! ## Environment Variables
//!
//! 1. **`PLUGIN_BRIDGE_LOG`** (highest priority)
//! 2. **`RUST_LOG`**
//! 3. **Config** - `log.level`, or `debug` with `--verbose`

use std::env;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LogConfig;

pub const LOG_ENV: &str = "PLUGIN_BRIDGE_LOG";

/// Returned from [`init`]; hold it until exit so buffered lines get flushed.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber
pub fn init(config: &LogConfig, verbose: bool) -> Result<LogGuard> {
    let filter = create_filter(&config.level, verbose)?;

    let (writer, guard) = match &config.file {
        Some(path) => {
            let (dir, filename) = split_log_path(path)?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, filename))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    Registry::default()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {}", e))?;

    Ok(LogGuard { _guard: guard })
}

fn create_filter(level: &str, verbose: bool) -> Result<EnvFilter> {
    let directives = env::var(LOG_ENV)
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_directive(level, verbose));

    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

fn default_directive(level: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        level.to_string()
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let filename = path
        .file_name()
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok((dir, filename))
}
