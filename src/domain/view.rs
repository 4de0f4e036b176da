//! Views and the view registry
//!
//! Every view gets its own cache, even when several views show the same
//! buffer. Re-announcing a view replaces its state wholesale.

use std::collections::HashMap;
use std::fmt;

use super::buffer::{syntax_from_path, BufferDescriptor, EditorConfig};
use super::cache::DocumentCache;

/// State of one open editor view
pub struct ViewState {
    pub id: String,
    pub buffer_id: u64,
    pub path: String,
    pub syntax: String,
    pub config: Option<EditorConfig>,
    pub cache: Box<dyn DocumentCache>,
}

impl ViewState {
    pub fn new(
        id: impl Into<String>,
        buffer: &BufferDescriptor,
        cache: Box<dyn DocumentCache>,
    ) -> Self {
        Self {
            id: id.into(),
            buffer_id: buffer.buffer_id,
            path: buffer.path.clone(),
            syntax: buffer.syntax_tag(),
            config: buffer.config.clone(),
            cache,
        }
    }

    /// Rebinds the view to a new path, keeping its cache
    pub fn rebind(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.syntax = syntax_from_path(&self.path);
    }

    pub fn revision(&self) -> u64 {
        self.cache.revision()
    }
}

impl fmt::Debug for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewState")
            .field("id", &self.id)
            .field("buffer_id", &self.buffer_id)
            .field("path", &self.path)
            .field("syntax", &self.syntax)
            .field("rev", &self.cache.revision())
            .finish()
    }
}

/// Open views keyed by view identifier
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: HashMap<String, ViewState>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh view for every identifier the buffer lists
    ///
    /// Existing views with the same identifier are replaced, discarding their
    /// cache. Returns the identifiers that were (re)created.
    pub fn init_buffer(
        &mut self,
        buffer: &BufferDescriptor,
        mut new_cache: impl FnMut() -> Box<dyn DocumentCache>,
    ) -> Vec<String> {
        let mut created = Vec::with_capacity(buffer.views.len());
        let mut unshadowed = 0;
        for view_id in &buffer.views {
            let mut cache = new_cache();
            if !cache.prepare(buffer) {
                unshadowed += 1;
            }
            let view = ViewState::new(view_id.clone(), buffer, cache);
            if self.views.insert(view_id.clone(), view).is_some() {
                tracing::debug!(view_id = %view_id, "replaced existing view");
            }
            created.push(view_id.clone());
        }
        if unshadowed > 0 {
            tracing::warn!(
                buffer_id = buffer.buffer_id,
                buf_size = buffer.buf_size,
                views = unshadowed,
                "buffer already has content, shadow text unavailable"
            );
        }
        created
    }

    pub fn get(&self, view_id: &str) -> Option<&ViewState> {
        self.views.get(view_id)
    }

    pub fn get_mut(&mut self, view_id: &str) -> Option<&mut ViewState> {
        self.views.get_mut(view_id)
    }

    pub fn remove(&mut self, view_id: &str) -> Option<ViewState> {
        self.views.remove(view_id)
    }

    pub fn contains(&self, view_id: &str) -> bool {
        self.views.contains_key(view_id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewState> {
        self.views.values()
    }
}
