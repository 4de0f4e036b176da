//! Buffer descriptors received during the handshake
//!
//! The host announces buffers in `initialize` and `new_buffer`. Each
//! descriptor names the views displaying the buffer; the bridge fans a
//! descriptor out into one view per listed identifier.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Editor configuration snapshot carried with a buffer
///
/// Passed through untouched. Keys this struct does not name are kept in
/// `extra` so the snapshot round-trips verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_indent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_face: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_ending: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_search_path: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_past_end: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_tabs_to_spaces: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_tab_stops: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_width: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A buffer announced by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferDescriptor {
    #[serde(default)]
    pub buffer_id: u64,

    /// Size in bytes
    #[serde(default)]
    pub buf_size: usize,

    #[serde(default)]
    pub nb_lines: usize,

    /// Backing file path, empty for unsaved buffers
    #[serde(default)]
    pub path: String,

    /// Host revision at announcement time
    #[serde(default)]
    pub rev: u64,

    /// Host-side syntax hint (the bridge derives its own tag from `path`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EditorConfig>,

    /// Views currently displaying this buffer
    #[serde(default)]
    pub views: Vec<String>,
}

impl BufferDescriptor {
    /// Syntax tag for this buffer's path
    pub fn syntax_tag(&self) -> String {
        syntax_from_path(&self.path)
    }
}

/// Payload of `initialize` and `new_buffer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Initialization {
    /// Identifier assigned to this plugin (only meaningful in `initialize`)
    #[serde(default)]
    pub plugin_id: u64,

    #[serde(default)]
    pub buffer_info: Vec<BufferDescriptor>,
}

/// Derives a syntax tag from a file path
///
/// The tag is whatever follows the last `.` of the final path component,
/// case preserved. Paths without an extension give an empty tag.
pub fn syntax_from_path(path: &str) -> String {
    let Some(name) = Path::new(path).file_name() else {
        return String::new();
    };
    let name = name.to_string_lossy();
    match name.rfind('.') {
        Some(dot) => name[dot + 1..].to_string(),
        None => String::new(),
    }
}
