//! Incremental document updates.
//!
//! An [`Update`] is an ordered, composable description of a text change,
//! tagged with the version it produces. Applying updates `v+1..w` in order
//! to a buffer at version `v` deterministically reproduces the buffer at
//! version `w` - the core correctness property of the whole subsystem.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::Version;
use crate::error::{AuthorityError, Result};

/// A single replace-range: delete `start..end` and insert `insert` there.
///
/// Offsets are character offsets into the buffer the edit is applied to.
/// An insertion has `start == end`; a deletion has an empty `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TextEdit {
    /// Character offset where the replaced range starts.
    pub start: usize,
    /// Character offset one past the end of the replaced range.
    pub end: usize,
    /// Text inserted in place of the range.
    pub insert: String,
}

impl TextEdit {
    /// Insert `text` at character offset `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            insert: text.into(),
        }
    }

    /// Replace the characters in `start..end` with `text`.
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            insert: text.into(),
        }
    }

    /// Delete the characters in `start..end`.
    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, "")
    }
}

/// A versioned batch of edits.
///
/// Edits apply sequentially: each edit's offsets address the intermediate
/// buffer produced by the previous one, so a batch is deterministic
/// regardless of how the editing surface grouped its changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Update {
    /// The version this update produces when applied.
    pub version: Version,
    /// Ordered replace-ranges.
    pub edits: Vec<TextEdit>,
}

impl Update {
    /// An update containing a single edit.
    pub fn single(version: Version, edit: TextEdit) -> Self {
        Self {
            version,
            edits: vec![edit],
        }
    }

    /// A whole-buffer replacement, used when a file changes on disk and the
    /// new content must be propagated as a regular update so pending pulls
    /// converge without a re-fetch.
    pub fn replace_all(version: Version, old_len_chars: usize, text: impl Into<String>) -> Self {
        Self::single(version, TextEdit::replace(0, old_len_chars, text))
    }

    /// Apply this update to `content`, returning the new buffer.
    ///
    /// Fails with [`AuthorityError::InvalidUpdate`] if any edit addresses a
    /// range outside the (intermediate) buffer; the buffer is untouched in
    /// that case since this works on an owned copy.
    pub fn apply_to(&self, content: &str) -> Result<String> {
        let mut buffer = content.to_string();
        for edit in &self.edits {
            buffer = apply_edit(&buffer, edit).map_err(|reason| {
                AuthorityError::InvalidUpdate {
                    version: self.version,
                    reason,
                }
            })?;
        }
        Ok(buffer)
    }
}

/// Apply one edit, translating character offsets to byte offsets.
fn apply_edit(buffer: &str, edit: &TextEdit) -> std::result::Result<String, String> {
    if edit.start > edit.end {
        return Err(format!("range start {} > end {}", edit.start, edit.end));
    }
    let char_count = buffer.chars().count();
    if edit.end > char_count {
        return Err(format!(
            "range end {} past buffer length {}",
            edit.end, char_count
        ));
    }

    let start_byte = char_to_byte(buffer, edit.start);
    let end_byte = char_to_byte(buffer, edit.end);

    let mut out = String::with_capacity(buffer.len() + edit.insert.len());
    out.push_str(&buffer[..start_byte]);
    out.push_str(&edit.insert);
    out.push_str(&buffer[end_byte..]);
    Ok(out)
}

fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}
