//! Session state
//!
//! Everything the bridge mutates while handling a message lives in
//! [`Session`], behind the bridge's single lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::hooks::Hooks;
use crate::domain::{DocumentCache, ViewRegistry};

/// Builds the cache for a newly announced view
pub type CacheFactory = Box<dyn Fn() -> Box<dyn DocumentCache> + Send>;

pub(crate) struct Session {
    pub(crate) views: ViewRegistry,
    pub(crate) hooks: Hooks,
    pub(crate) new_cache: CacheFactory,
}

impl Session {
    pub(crate) fn new(new_cache: CacheFactory) -> Self {
        Self {
            views: ViewRegistry::new(),
            hooks: Hooks::default(),
            new_cache,
        }
    }
}

/// Cooperative shutdown flag
///
/// Stopping never interrupts a message already being handled; it only
/// keeps the read loop from dispatching the next one.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            tracing::info!("stop signal raised");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_shared_between_clones() {
        let signal = StopSignal::new();
        let clone = signal.clone();

        assert!(!clone.is_stopped());
        signal.stop();
        assert!(clone.is_stopped());

        signal.stop();
        assert!(signal.is_stopped());
    }
}
