//! Per-view document caches
//!
//! A cache holds one view's shadow of the host document and the revision it
//! reflects. Revisions only move forward: an update behind the current
//! revision is rejected, a repeat of the current revision is a no-op.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::buffer::BufferDescriptor;
use super::update::UpdateEvent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("update targets revision {requested}, cache is already at {current}")]
    StaleRevision { current: u64, requested: u64 },
}

/// Shadow state for one view
pub trait DocumentCache: Send {
    /// Applies an update and returns the resulting revision
    fn apply_update(&mut self, update: &UpdateEvent) -> Result<u64, CacheError>;

    /// Current revision
    fn revision(&self) -> u64;

    /// Called once when a view is created for `buffer`
    ///
    /// Returns false if the cache cannot shadow the content the buffer
    /// already has.
    fn prepare(&mut self, _buffer: &BufferDescriptor) -> bool {
        true
    }

    /// Shadow text, if this cache keeps one and it is in sync
    fn text(&self) -> Option<&str> {
        None
    }
}

/// Which cache new views get
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Keep a full shadow copy of the text; only useful for buffers that
    /// start empty, since the host never sends initial content
    Text,
    /// Track revisions only
    #[default]
    Revision,
}

impl CacheMode {
    pub fn as_str(&self) -> &str {
        match self {
            CacheMode::Text => "text",
            CacheMode::Revision => "revision",
        }
    }

    /// Creates an empty cache of this kind
    pub fn new_cache(&self) -> Box<dyn DocumentCache> {
        match self {
            CacheMode::Text => Box::new(TextCache::new()),
            CacheMode::Revision => Box::new(RevisionCache::new()),
        }
    }
}

/// Checks the revision contract; `Ok(false)` means the update is a duplicate
fn check_revision(current: u64, update: &UpdateEvent) -> Result<bool, CacheError> {
    if update.rev < current {
        return Err(CacheError::StaleRevision {
            current,
            requested: update.rev,
        });
    }
    Ok(update.rev > current)
}

/// Cache that only tracks the revision
#[derive(Debug, Default)]
pub struct RevisionCache {
    rev: u64,
}

impl RevisionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentCache for RevisionCache {
    fn apply_update(&mut self, update: &UpdateEvent) -> Result<u64, CacheError> {
        if check_revision(self.rev, update)? {
            self.rev = update.rev;
        }
        Ok(self.rev)
    }

    fn revision(&self) -> u64 {
        self.rev
    }
}

/// Cache holding a shadow copy of the text
///
/// Starts empty and in sync, unless the buffer it is prepared for already
/// has content. Once an update arrives that cannot be applied
/// to the shadow (no delta, wrong base length, bad range) the text is
/// dropped and the cache keeps counting revisions only.
#[derive(Debug)]
pub struct TextCache {
    rev: u64,
    text: Option<String>,
}

impl TextCache {
    pub fn new() -> Self {
        Self {
            rev: 0,
            text: Some(String::new()),
        }
    }

    /// Returns true while the shadow text tracks the host document
    pub fn is_synced(&self) -> bool {
        self.text.is_some()
    }

    fn desync(&mut self, view_id: &str, reason: &str) {
        if self.text.take().is_some() {
            tracing::warn!(view_id, reason, rev = self.rev, "shadow text desynchronised");
        }
    }
}

impl Default for TextCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentCache for TextCache {
    fn apply_update(&mut self, update: &UpdateEvent) -> Result<u64, CacheError> {
        if !check_revision(self.rev, update)? {
            return Ok(self.rev);
        }
        self.rev = update.rev;

        let Some(base) = self.text.as_deref() else {
            return Ok(self.rev);
        };
        let Some(delta) = &update.delta else {
            self.desync(&update.view_id, "update carried no delta");
            return Ok(self.rev);
        };

        match delta.apply(base) {
            Ok(next) => {
                if update.new_len.is_some_and(|len| len != next.len()) {
                    self.desync(&update.view_id, "length disagrees with host");
                } else {
                    self.text = Some(next);
                }
            }
            Err(err) => self.desync(&update.view_id, &err.to_string()),
        }
        Ok(self.rev)
    }

    fn revision(&self) -> u64 {
        self.rev
    }

    fn prepare(&mut self, buffer: &BufferDescriptor) -> bool {
        if buffer.buf_size > 0 {
            self.text = None;
            return false;
        }
        true
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
