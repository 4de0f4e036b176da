//! The protocol bridge
//!
//! [`Bridge::handle`] is the single entry point for inbound frames. Each
//! message is handled to completion under one lock, hooks included, so
//! initialization and updates never interleave and no view is ever seen
//! half-built. Faults stay at this boundary: requests always get exactly
//! one reply, notifications never get one, and a panic in a handler is
//! logged without taking the session down.

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::BridgeError;
use super::hooks::{self, HookContext, HookEvent, HookOutcome};
use super::protocol::{
    Incoming, RequestId, Response, RpcError, DID_CLOSE, DID_SAVE, INITIALIZE, NEW_BUFFER,
    SHUTDOWN, UPDATE,
};
use super::session::{CacheFactory, Session, StopSignal};
use super::transport::Peer;
use crate::domain::{
    BufferDescriptor, CacheMode, CloseEvent, DocumentCache, EditProposal, Initialization,
    SaveEvent, UpdateEvent, ViewRegistry, ViewState,
};

/// Plugin side of the host connection
pub struct Bridge {
    session: Mutex<Session>,
    plugin_id: OnceLock<u64>,
    peer: Peer,
}

impl Bridge {
    /// Creates a bridge whose views track revisions only
    pub fn new(peer: Peer) -> Self {
        Self::with_cache_mode(peer, CacheMode::default())
    }

    /// Creates a bridge whose views get caches of the given kind
    pub fn with_cache_mode(peer: Peer, mode: CacheMode) -> Self {
        Self::with_cache_factory(peer, move || mode.new_cache())
    }

    /// Creates a bridge that builds view caches with `new_cache`
    pub fn with_cache_factory<F>(peer: Peer, new_cache: F) -> Self
    where
        F: Fn() -> Box<dyn DocumentCache> + Send + 'static,
    {
        let new_cache: CacheFactory = Box::new(new_cache);
        Self {
            session: Mutex::new(Session::new(new_cache)),
            plugin_id: OnceLock::new(),
            peer,
        }
    }

    /// Registers the general hook, replacing any previous one
    pub fn set_handle_fn<F>(&self, hook: F)
    where
        F: FnMut(&HookContext<'_>, &HookEvent<'_>) -> HookOutcome + Send + 'static,
    {
        self.session.lock().hooks.general = Some(Box::new(hook));
    }

    /// Registers the before-update hook, replacing any previous one
    pub fn set_handle_before_fn<F>(&self, hook: F)
    where
        F: FnMut(&HookContext<'_>, &HookEvent<'_>) -> HookOutcome + Send + 'static,
    {
        self.session.lock().hooks.before = Some(Box::new(hook));
    }

    /// Identifier assigned by the host, once `initialize` has arrived
    pub fn plugin_id(&self) -> Option<u64> {
        self.plugin_id.get().copied()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        self.peer.stop_signal()
    }

    /// Asks the read loop to stop after the current message
    pub fn stop(&self) {
        self.peer.stop_signal().stop();
    }

    /// Runs `f` with the view registry under the session lock
    ///
    /// Must not be called from inside a hook.
    pub fn with_views<T>(&self, f: impl FnOnce(&ViewRegistry) -> T) -> T {
        f(&self.session.lock().views)
    }

    /// Proposes an edit to the host
    ///
    /// Sends one `edit` notification and returns without waiting for any
    /// answer. Local state is untouched; the host's resulting `update`
    /// arrives through [`Bridge::handle`] like any other.
    pub fn edit(&self, view: &ViewState, edit: &EditProposal) -> Result<(), BridgeError> {
        let plugin_id = self.plugin_id().ok_or(BridgeError::NotInitialized)?;
        self.peer.edit(plugin_id, &view.id, edit)
    }

    /// Handles one inbound frame
    pub fn handle(&self, message: Incoming) {
        let method = message.method().unwrap_or("<response>").to_string();
        let handled = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(message)));
        if let Err(payload) = handled {
            tracing::error!(
                method = %method,
                panic = %hooks::panic_message(payload.as_ref()),
                "message handler panicked"
            );
        }
    }

    /// Answers a frame that could not be parsed
    ///
    /// Frames with a readable `id` get an invalid-request error, input that
    /// was not JSON at all gets a parse error with a `null` id. Anything else
    /// cannot be answered and is only logged.
    pub fn reject(&self, err: &BridgeError) {
        let Some(id) = err.rejection_id() else {
            tracing::warn!(error = %err, "dropping frame");
            return;
        };

        tracing::warn!(?id, error = %err, "rejecting frame");
        if let Err(write_err) = self.peer.respond(&Response::rejected(id, err.to_rpc_error())) {
            tracing::warn!(error = %write_err, "failed to send rejection");
        }
    }

    fn dispatch(&self, message: Incoming) {
        let (id, method, params) = match message {
            Incoming::Request { id, method, params } => (Some(id), method, params),
            Incoming::Notification { method, params } => (None, method, params),
            Incoming::Response { id } => {
                tracing::debug!(?id, "ignoring response from host");
                return;
            }
        };

        // Declared before the lock so the reply goes out after it is released,
        // on every exit path including unwinding.
        let mut reply = id.map(|id| PendingReply::new(&self.peer, id));
        let mut session = self.session.lock();
        tracing::debug!(method = %method, request = reply.is_some(), "now handle");

        let handled = match method.as_str() {
            INITIALIZE => self.initialize(&mut session, params),
            NEW_BUFFER => self.new_buffer(&mut session, params),
            UPDATE => self.update(&mut session, params),
            DID_SAVE => self.did_save(&mut session, params),
            DID_CLOSE => self.did_close(&mut session, params),
            SHUTDOWN => {
                tracing::info!("host requested shutdown");
                self.stop();
                Ok(None)
            }
            other => Err(BridgeError::MethodNotFound(other.to_string())),
        };

        match handled {
            Ok(result) => {
                if let (Some(reply), Some(result)) = (reply.as_mut(), result) {
                    reply.set(result);
                }
            }
            Err(err) if err.abandons_message() => {
                tracing::warn!(method = %method, error = %err, "abandoning message");
            }
            Err(err) => {
                tracing::warn!(method = %method, error = %err, "message failed");
                if let Some(reply) = reply.as_mut() {
                    reply.fail(err.to_rpc_error());
                }
            }
        }

        tracing::debug!(method = %method, "handle done");
    }

    fn initialize(
        &self,
        session: &mut Session,
        params: Value,
    ) -> Result<Option<Value>, BridgeError> {
        let init: Initialization = decode(INITIALIZE, params)?;

        match self.plugin_id.set(init.plugin_id) {
            Ok(()) => tracing::info!(plugin_id = init.plugin_id, "plugin initialized"),
            Err(_) => tracing::warn!(
                plugin_id = ?self.plugin_id(),
                ignored = init.plugin_id,
                "repeated initialize, keeping the first plugin id"
            ),
        }

        self.init_buffers(session, &init.buffer_info);
        self.observe(session, &HookEvent::Initialize(&init))?;
        Ok(None)
    }

    fn new_buffer(
        &self,
        session: &mut Session,
        params: Value,
    ) -> Result<Option<Value>, BridgeError> {
        let init: Initialization = decode(NEW_BUFFER, params)?;

        self.init_buffers(session, &init.buffer_info);
        self.observe(session, &HookEvent::NewBuffer(&init))?;
        Ok(None)
    }

    fn update(&self, session: &mut Session, params: Value) -> Result<Option<Value>, BridgeError> {
        let update: UpdateEvent = decode(UPDATE, params)?;
        let event = HookEvent::Update(&update);
        let Session { views, hooks, .. } = session;
        let mut result = None;

        if let Some(before) = hooks.before.as_mut() {
            let ctx = self.context(views);
            let outcome = hooks::invoke("before", before, &ctx, &event)?;
            if outcome.override_default {
                tracing::debug!(view_id = %update.view_id, rev = update.rev, "before hook overrode update");
                return Ok(outcome.result);
            }
            result = outcome.result;
        }

        let view = views
            .get_mut(&update.view_id)
            .ok_or_else(|| BridgeError::UnknownView(update.view_id.clone()))?;
        let rev = view.cache.apply_update(&update)?;
        tracing::debug!(view_id = %update.view_id, rev, author = %update.author, "applied update");

        if let Some(general) = hooks.general.as_mut() {
            let ctx = self.context(views);
            result = hooks::invoke("general", general, &ctx, &event)?.result;
        }
        Ok(result)
    }

    fn did_save(&self, session: &mut Session, params: Value) -> Result<Option<Value>, BridgeError> {
        let save: SaveEvent = decode(DID_SAVE, params)?;

        let view = session
            .views
            .get_mut(&save.view_id)
            .ok_or_else(|| BridgeError::UnknownView(save.view_id.clone()))?;
        view.rebind(save.path.as_str());
        tracing::info!(view_id = %save.view_id, path = %save.path, syntax = %view.syntax, "view saved");

        self.observe(session, &HookEvent::Saved(&save))?;
        Ok(None)
    }

    fn did_close(
        &self,
        session: &mut Session,
        params: Value,
    ) -> Result<Option<Value>, BridgeError> {
        let close: CloseEvent = decode(DID_CLOSE, params)?;

        if session.views.remove(&close.view_id).is_none() {
            return Err(BridgeError::UnknownView(close.view_id));
        }
        tracing::info!(view_id = %close.view_id, "view closed");

        self.observe(session, &HookEvent::Closed(&close))?;
        Ok(None)
    }

    fn init_buffers(&self, session: &mut Session, buffers: &[BufferDescriptor]) {
        let Session {
            views, new_cache, ..
        } = session;
        let new_cache: &(dyn Fn() -> Box<dyn DocumentCache> + Send) = &**new_cache;
        for buffer in buffers {
            let created = views.init_buffer(buffer, new_cache);
            tracing::info!(
                buffer_id = buffer.buffer_id,
                path = %buffer.path,
                syntax = %buffer.syntax_tag(),
                views = ?created,
                "buffer initialized"
            );
        }
    }

    /// Shows an event to the general hook, discarding its result
    fn observe(&self, session: &mut Session, event: &HookEvent<'_>) -> Result<(), BridgeError> {
        let Session { views, hooks, .. } = session;
        if let Some(general) = hooks.general.as_mut() {
            let ctx = self.context(views);
            hooks::invoke("general", general, &ctx, event)?;
        }
        Ok(())
    }

    fn context<'a>(&'a self, views: &'a ViewRegistry) -> HookContext<'a> {
        HookContext::new(self.plugin_id(), views, &self.peer)
    }
}

impl BridgeError {
    /// Faults that abandon the message but still reply with the default result
    fn abandons_message(&self) -> bool {
        matches!(self, BridgeError::Decode { .. } | BridgeError::Hook(_))
    }
}

fn decode<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, BridgeError> {
    serde_json::from_value(params).map_err(|source| BridgeError::Decode {
        method: method.to_string(),
        source,
    })
}

/// Obligation to answer a request, discharged when dropped
///
/// Replies `0` unless a result or an error was recorded first.
struct PendingReply<'a> {
    peer: &'a Peer,
    id: RequestId,
    outcome: Option<Result<Value, RpcError>>,
}

impl<'a> PendingReply<'a> {
    fn new(peer: &'a Peer, id: RequestId) -> Self {
        Self {
            peer,
            id,
            outcome: None,
        }
    }

    fn set(&mut self, result: Value) {
        self.outcome = Some(Ok(result));
    }

    fn fail(&mut self, error: RpcError) {
        self.outcome = Some(Err(error));
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        let id = self.id.clone();
        let response = match self.outcome.take() {
            Some(Ok(result)) if !result.is_null() => Response::success(id, result),
            Some(Err(error)) => Response::error(id, error),
            _ => Response::success(id, Value::from(0)),
        };
        if let Err(err) = self.peer.respond(&response) {
            tracing::warn!(id = ?self.id, error = %err, "failed to send reply");
        }
    }
}
