//! # Plugin Bridge
//!
//! Plugin side of the host connection. The host launches the plugin and
//! talks to it with newline-delimited JSON over stdin/stdout.
//!
//! ## Protocol
//!
//! ```text
//! Host                                   Plugin
//!  │                                       │
//!  ├── initialize {plugin_id, buffer_info} │  views created, no reply
//!  ├── new_buffer {buffer_info}            │  views created, no reply
//!  ├── update {view_id, rev, delta} (id)   │  cache advanced
//!  │◄───────────────── {"id":..,"result":0}┤
//!  │◄──── edit {edit, view_id, plugin_id} ─┤  fire-and-forget
//!  ├── did_save / did_close                │
//!  └── shutdown                            │
//! ```
//!
//! Every request gets exactly one reply. Notifications get none.
//!
//! ## Hooks
//!
//! Behaviour is customised with two hooks registered on [`Bridge`]: a
//! before-update hook that may short-circuit default processing, and a
//! general hook that observes every lifecycle event and supplies the reply
//! to `update`.

mod bridge;
mod error;
mod hooks;
mod protocol;
mod session;
mod transport;

pub use bridge::Bridge;
pub use error::BridgeError;
pub use hooks::{HandleFn, HookContext, HookEvent, HookOutcome};
pub use protocol::{
    Incoming, Notification, PluginManifest, RequestId, Response, RpcError, CACHE_REJECTED,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, UNKNOWN_VIEW,
};
pub use session::{CacheFactory, StopSignal};
pub use transport::{serve, Peer};

/// Method names understood on the wire
pub mod methods {
    pub use super::protocol::{
        DID_CLOSE, DID_SAVE, EDIT, INBOUND_METHODS, INITIALIZE, NEW_BUFFER, OUTBOUND_METHODS,
        SHUTDOWN, UPDATE,
    };
}
