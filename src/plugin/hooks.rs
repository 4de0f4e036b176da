//! Handler hooks
//!
//! Two hooks can observe the bridge. The *before* hook runs ahead of every
//! `update` and may override default processing. The *general* hook runs
//! after every handled lifecycle message and supplies the reply to
//! `update`.
//!
//! Hooks run synchronously while the session lock is held. A slow hook
//! stalls every later message, and a hook must not call back into
//! [`Bridge`](super::Bridge) methods that take the lock (hook
//! registration, `with_views`). Emitting edits through
//! [`HookContext::edit`] is fine: emission never takes the session lock.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use super::error::BridgeError;
use super::transport::Peer;
use crate::domain::{
    CloseEvent, EditProposal, Initialization, SaveEvent, UpdateEvent, ViewRegistry, ViewState,
};

/// What a hook is being told about
#[derive(Debug, Clone, Copy)]
pub enum HookEvent<'a> {
    Initialize(&'a Initialization),
    NewBuffer(&'a Initialization),
    Update(&'a UpdateEvent),
    Saved(&'a SaveEvent),
    Closed(&'a CloseEvent),
}

impl HookEvent<'_> {
    /// Protocol method that produced this event
    pub fn method(&self) -> &'static str {
        match self {
            HookEvent::Initialize(_) => super::protocol::INITIALIZE,
            HookEvent::NewBuffer(_) => super::protocol::NEW_BUFFER,
            HookEvent::Update(_) => super::protocol::UPDATE,
            HookEvent::Saved(_) => super::protocol::DID_SAVE,
            HookEvent::Closed(_) => super::protocol::DID_CLOSE,
        }
    }
}

/// Value returned by a hook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOutcome {
    /// Reply payload for `update`; `None` and `null` reply `0`
    pub result: Option<Value>,

    /// Skip default processing (only honoured for the before hook)
    pub override_default: bool,
}

impl HookOutcome {
    /// No result, continue normally
    pub fn pass() -> Self {
        Self::default()
    }

    /// Continue normally and reply with `value`
    pub fn reply(value: impl Into<Value>) -> Self {
        Self {
            result: Some(value.into()),
            override_default: false,
        }
    }

    /// Stop default processing and reply with `value`
    pub fn override_with(value: impl Into<Value>) -> Self {
        Self {
            result: Some(value.into()),
            override_default: true,
        }
    }
}

/// Read access to session state from inside a hook
pub struct HookContext<'a> {
    plugin_id: Option<u64>,
    views: &'a ViewRegistry,
    peer: &'a Peer,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(plugin_id: Option<u64>, views: &'a ViewRegistry, peer: &'a Peer) -> Self {
        Self {
            plugin_id,
            views,
            peer,
        }
    }

    /// Identifier assigned in the handshake
    pub fn plugin_id(&self) -> Option<u64> {
        self.plugin_id
    }

    pub fn views(&self) -> &ViewRegistry {
        self.views
    }

    pub fn view(&self, view_id: &str) -> Option<&ViewState> {
        self.views.get(view_id)
    }

    /// Proposes an edit to the host for an open view
    pub fn edit(&self, view_id: &str, edit: &EditProposal) -> Result<(), BridgeError> {
        if !self.views.contains(view_id) {
            return Err(BridgeError::UnknownView(view_id.to_string()));
        }
        let plugin_id = self.plugin_id.ok_or(BridgeError::NotInitialized)?;
        self.peer.edit(plugin_id, view_id, edit)
    }
}

/// A registered hook
pub type HandleFn = Box<dyn FnMut(&HookContext<'_>, &HookEvent<'_>) -> HookOutcome + Send>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) before: Option<HandleFn>,
    pub(crate) general: Option<HandleFn>,
}

/// Runs a hook, turning a panic into [`BridgeError::Hook`]
pub(crate) fn invoke(
    name: &'static str,
    hook: &mut HandleFn,
    ctx: &HookContext<'_>,
    event: &HookEvent<'_>,
) -> Result<HookOutcome, BridgeError> {
    panic::catch_unwind(AssertUnwindSafe(|| hook(ctx, event))).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(hook = name, method = event.method(), panic = %message, "hook panicked");
        BridgeError::Hook(message)
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BufferDescriptor, CacheMode, Delta};
    use crate::plugin::transport::capture;

    fn registry() -> ViewRegistry {
        let mut views = ViewRegistry::new();
        let buffer = BufferDescriptor {
            path: "main.rs".to_string(),
            views: vec!["v1".to_string()],
            ..Default::default()
        };
        views.init_buffer(&buffer, || CacheMode::Text.new_cache());
        views
    }

    #[test]
    fn outcome_constructors() {
        assert_eq!(HookOutcome::pass().result, None);
        assert!(!HookOutcome::reply(3).override_default);
        assert!(HookOutcome::override_with("x").override_default);
    }

    #[test]
    fn invoke_catches_panics() {
        let (peer, _frames) = capture();
        let views = registry();
        let ctx = HookContext::new(Some(1), &views, &peer);
        let update = UpdateEvent::new("v1", 1, None);
        let mut hook: HandleFn = Box::new(|_, _| -> HookOutcome { panic!("boom") });

        let err = invoke("general", &mut hook, &ctx, &HookEvent::Update(&update)).unwrap_err();
        assert!(matches!(err, BridgeError::Hook(ref msg) if msg == "boom"));
    }

    #[test]
    fn context_edit_checks_view() {
        let (peer, frames) = capture();
        let views = registry();
        let ctx = HookContext::new(Some(4), &views, &peer);
        let edit = EditProposal::new(0, Delta::insert(0, 0, "x"), "test");

        assert!(matches!(
            ctx.edit("missing", &edit),
            Err(BridgeError::UnknownView(_))
        ));
        ctx.edit("v1", &edit).unwrap();

        let sent = frames.frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["params"]["plugin_id"], 4);
    }

    #[test]
    fn context_edit_needs_plugin_id() {
        let (peer, frames) = capture();
        let views = registry();
        let ctx = HookContext::new(None, &views, &peer);
        let edit = EditProposal::new(0, Delta::insert(0, 0, "x"), "test");

        assert!(matches!(
            ctx.edit("v1", &edit),
            Err(BridgeError::NotInitialized)
        ));
        assert!(frames.frames().is_empty());
    }
}
