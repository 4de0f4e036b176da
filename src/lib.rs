//! Plugin Bridge - the plugin side of an editor host sync protocol
//!
//! A host editor launches the plugin and streams buffer lifecycle events to
//! it as newline-delimited JSON. The bridge keeps a per-view document cache
//! in step with the host's revisions, runs user hooks on each event, and
//! lets the plugin propose edits back to the host.

pub mod cli;
pub mod config;
pub mod domain;
pub mod plugin;

pub use config::Config;
pub use domain::{CacheMode, Delta, DocumentCache, EditProposal, ViewRegistry, ViewState};
pub use plugin::{serve, Bridge, BridgeError, HookContext, HookEvent, HookOutcome, Peer};
