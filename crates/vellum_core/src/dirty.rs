//! Unsaved-change tracking.
//!
//! The tracker holds the set of open documents whose buffer differs from
//! the last saved snapshot. It is a pure set: the store decides *whether* a
//! document is dirty, the tracker only records the answer so window badges
//! and the quit-confirmation flow can query it cheaply.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use indexmap::IndexSet;

/// Set of paths with unsaved modifications, in first-dirtied order.
#[derive(Default)]
pub struct ModificationTracker {
    dirty: RwLock<IndexSet<PathBuf>>,
}

impl ModificationTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as modified. Returns true if the set changed, so the
    /// caller emits a status event only on a transition, never on every
    /// keystroke.
    pub fn mark_dirty(&self, path: &Path) -> bool {
        self.dirty.write().unwrap().insert(path.to_path_buf())
    }

    /// Record `path` as saved (or closed). Returns true if the set changed.
    pub fn mark_clean(&self, path: &Path) -> bool {
        self.dirty.write().unwrap().shift_remove(path)
    }

    /// Whether `path` currently has unsaved modifications.
    pub fn is_dirty(&self, path: &Path) -> bool {
        self.dirty.read().unwrap().contains(path)
    }

    /// Snapshot of every modified path, in first-dirtied order.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.dirty.read().unwrap().iter().cloned().collect()
    }

    /// True when nothing has unsaved modifications.
    pub fn is_empty(&self) -> bool {
        self.dirty.read().unwrap().is_empty()
    }
}
