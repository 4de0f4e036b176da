//! Host-initiated view events

use serde::{Deserialize, Serialize};

use super::delta::Delta;

/// A revision-tagged change addressed to one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub view_id: String,

    /// Revision the document reaches once this update is applied
    pub rev: u64,

    /// Absent when the host chose not to send the change (e.g. too large)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_len: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_line_count: Option<usize>,

    /// Who made the change (another plugin's tag, or empty for the user)
    #[serde(default)]
    pub author: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_type: Option<String>,
}

impl UpdateEvent {
    pub fn new(view_id: impl Into<String>, rev: u64, delta: Option<Delta>) -> Self {
        Self {
            view_id: view_id.into(),
            rev,
            new_len: delta.as_ref().map(Delta::new_len),
            delta,
            new_line_count: None,
            author: String::new(),
            edit_type: None,
        }
    }
}

/// Payload of `did_save`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEvent {
    pub view_id: String,
    pub path: String,
}

/// Payload of `did_close`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseEvent {
    pub view_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_minimal_update() {
        let update: UpdateEvent =
            serde_json::from_str(r#"{"view_id": "v1", "rev": 4}"#).unwrap();

        assert_eq!(update.view_id, "v1");
        assert_eq!(update.rev, 4);
        assert!(update.delta.is_none());
        assert!(update.author.is_empty());
    }

    #[test]
    fn decode_full_update() {
        let json = serde_json::json!({
            "view_id": "v1",
            "rev": 2,
            "delta": {"els": [{"insert": "fn"}], "base_len": 0},
            "new_len": 2,
            "new_line_count": 1,
            "author": "core",
            "edit_type": "insert"
        });
        let update: UpdateEvent = serde_json::from_value(json).unwrap();

        assert_eq!(update.new_len, Some(2));
        assert_eq!(update.edit_type.as_deref(), Some("insert"));
        assert_eq!(update.delta.unwrap().new_len(), 2);
    }

    #[test]
    fn update_requires_view_and_rev() {
        assert!(serde_json::from_str::<UpdateEvent>(r#"{"rev": 1}"#).is_err());
        assert!(serde_json::from_str::<UpdateEvent>(r#"{"view_id": "v1"}"#).is_err());
    }
}
