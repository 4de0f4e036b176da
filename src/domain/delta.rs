//! Incremental text changes
//!
//! A delta describes a new document in terms of an old one: a sequence of
//! elements that either copy a byte range out of the base text or insert new
//! text. Applying a delta to a base of length `base_len` produces the next
//! revision's text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeltaError {
    #[error("delta expects base length {expected}, got {actual}")]
    BaseLength { expected: usize, actual: usize },

    #[error("copy range {start}..{end} is invalid for base of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },
}

/// One step of a delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaElement {
    /// Copy the byte range `start..end` of the base text
    Copy(usize, usize),

    /// Insert literal text
    Insert(String),
}

/// A change from one revision of a document to the next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Elements in output order
    #[serde(default)]
    pub els: Vec<DeltaElement>,

    /// Length in bytes of the text this delta applies to
    pub base_len: usize,
}

impl Delta {
    pub fn new(base_len: usize, els: Vec<DeltaElement>) -> Self {
        Self { els, base_len }
    }

    /// A delta that inserts `text` at byte offset `at` of a base of length `base_len`
    pub fn insert(base_len: usize, at: usize, text: impl Into<String>) -> Self {
        let mut els = Vec::with_capacity(3);
        if at > 0 {
            els.push(DeltaElement::Copy(0, at));
        }
        els.push(DeltaElement::Insert(text.into()));
        if at < base_len {
            els.push(DeltaElement::Copy(at, base_len));
        }
        Self { els, base_len }
    }

    /// Length of the text produced by applying this delta
    pub fn new_len(&self) -> usize {
        self.els
            .iter()
            .map(|el| match el {
                DeltaElement::Copy(start, end) => end.saturating_sub(*start),
                DeltaElement::Insert(text) => text.len(),
            })
            .sum()
    }

    /// Returns true if applying this delta yields the base text unchanged
    pub fn is_identity(&self) -> bool {
        match self.els.as_slice() {
            [] => self.base_len == 0,
            [DeltaElement::Copy(0, end)] => *end == self.base_len,
            _ => false,
        }
    }

    /// Applies the delta to `base`, producing the new text
    pub fn apply(&self, base: &str) -> Result<String, DeltaError> {
        if base.len() != self.base_len {
            return Err(DeltaError::BaseLength {
                expected: self.base_len,
                actual: base.len(),
            });
        }

        let mut out = String::with_capacity(self.new_len());
        for el in &self.els {
            match el {
                DeltaElement::Copy(start, end) => {
                    let slice = base.get(*start..*end).ok_or(DeltaError::InvalidRange {
                        start: *start,
                        end: *end,
                        len: base.len(),
                    })?;
                    out.push_str(slice);
                }
                DeltaElement::Insert(text) => out.push_str(text),
            }
        }
        Ok(out)
    }
}
