//! Domain models for the plugin bridge
//!
//! Views, buffers, deltas, and caches, without any I/O concerns.

mod buffer;
mod cache;
mod delta;
mod edit;
mod update;
mod view;

pub use buffer::{syntax_from_path, BufferDescriptor, EditorConfig, Initialization};
pub use cache::{CacheError, CacheMode, DocumentCache, RevisionCache, TextCache};
pub use delta::{Delta, DeltaElement, DeltaError};
pub use edit::{EditProposal, EDIT_PRIORITY_HIGH, EDIT_PRIORITY_NORMAL};
pub use update::{CloseEvent, SaveEvent, UpdateEvent};
pub use view::{ViewRegistry, ViewState};
