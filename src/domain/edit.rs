//! Plugin-proposed edits
//!
//! An edit is a proposal: the host merges it into the authoritative
//! document and the result comes back to every plugin as an ordinary
//! `update`. When several plugins propose edits against the same revision
//! the host orders them by priority, higher first.

use serde::{Deserialize, Serialize};

use super::delta::Delta;

/// Priority reserved for edits that must land ahead of ordinary plugin edits
pub const EDIT_PRIORITY_HIGH: u64 = 0x1000_0000;

/// Priority for ordinary plugin edits
pub const EDIT_PRIORITY_NORMAL: u64 = 0x0100_0000;

/// An edit proposed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditProposal {
    /// Revision the delta was computed against
    pub rev: u64,

    pub delta: Delta,

    pub priority: u64,

    /// Anchor the insertion after the cursor instead of at an absolute offset
    pub after_cursor: bool,

    /// Author tag reported back in the resulting update
    pub author: String,

    /// Document length after the edit, when it changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_len: Option<usize>,
}

impl EditProposal {
    /// Creates a normal-priority edit
    pub fn new(rev: u64, delta: Delta, author: impl Into<String>) -> Self {
        Self {
            rev,
            delta,
            priority: EDIT_PRIORITY_NORMAL,
            after_cursor: false,
            author: author.into(),
            new_len: None,
        }
    }

    pub fn with_priority(mut self, priority: u64) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the edit as one that must apply ahead of normal edits
    pub fn high_priority(self) -> Self {
        self.with_priority(EDIT_PRIORITY_HIGH)
    }

    pub fn after_cursor(mut self) -> Self {
        self.after_cursor = true;
        self
    }

    /// Records the resulting length when it differs from the base
    pub fn with_new_len(mut self, new_len: usize) -> Self {
        self.new_len = Some(new_len);
        self
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority >= EDIT_PRIORITY_HIGH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_edit_is_normal_priority() {
        let edit = EditProposal::new(3, Delta::insert(0, 0, "x"), "fmt");

        assert_eq!(edit.priority, EDIT_PRIORITY_NORMAL);
        assert!(!edit.is_high_priority());
        assert!(!edit.after_cursor);
    }

    #[test]
    fn high_priority_outranks_normal() {
        let edit = EditProposal::new(3, Delta::insert(0, 0, "x"), "fmt").high_priority();

        assert!(edit.is_high_priority());
        assert!(EDIT_PRIORITY_HIGH > EDIT_PRIORITY_NORMAL);
    }

    #[test]
    fn serialization_omits_missing_new_len() {
        let edit = EditProposal::new(1, Delta::insert(0, 0, "ab"), "fmt").after_cursor();
        let value = serde_json::to_value(&edit).unwrap();

        assert_eq!(value["after_cursor"], true);
        assert_eq!(value["author"], "fmt");
        assert!(value.get("new_len").is_none());

        let value = serde_json::to_value(edit.with_new_len(2)).unwrap();
        assert_eq!(value["new_len"], 2);
    }
}
