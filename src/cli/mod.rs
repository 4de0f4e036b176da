//! # Command-Line Interface
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `serve` (default) | Run the bridge on stdin/stdout |
//! | `manifest` | Print the plugin name, version and methods |
//! | `config` | Print the effective configuration |
//!
//! ## Output Formats
//!
//! `manifest` and `config` support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! `--verbose` (or `-v`) prints progress notes to stderr and lowers the
//! default log filter to `debug`:
//! ```bash
//! plugin-bridge --verbose serve --log-file /tmp/bridge.log
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod logging;
mod output;
mod serve;

pub use app::{run, Cli, Commands};
pub use logging::{LogGuard, LOG_ENV};
pub use output::{Output, OutputFormat};
