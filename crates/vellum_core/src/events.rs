//! Authority event types.
//!
//! Events describe state transitions after they happen; none of them carry
//! document content (views that care re-fetch or pull). Each event is
//! either broadcast to every window or scoped to the window whose layout it
//! concerns.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::tree::{NodeId, WindowId};

/// Delivery scope of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Deliver to every subscriber.
    Broadcast,
    /// Deliver only to subscribers of this window.
    Window(WindowId),
}

/// Events emitted by the authority.
///
/// Serialized with a `type` tag so frontend subscribers can dispatch on the
/// event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthorityEvent {
    /// A document became resident (first fetch this residency).
    FileOpened {
        /// Path of the opened document.
        path: PathBuf,
    },
    /// A document was evicted from the store.
    FileClosed {
        /// Path of the closed document.
        path: PathBuf,
    },
    /// The file changed on disk outside this process and the buffer was
    /// replaced.
    FileRemotelyChanged {
        /// Path of the rewritten document.
        path: PathBuf,
    },
    /// The external save pipeline persisted a document.
    FileSaved {
        /// Path of the saved document.
        path: PathBuf,
    },
    /// The set of documents with unsaved modifications changed. Carries the
    /// whole set so subscribers need no local bookkeeping.
    FileStatusChanged {
        /// Every path with unsaved modifications, in first-dirtied order.
        modified: Vec<PathBuf>,
    },
    /// A leaf's tabs were re-sorted.
    FilesSorted {
        /// Owning window.
        window: WindowId,
        /// The re-sorted leaf.
        leaf: NodeId,
    },
    /// A leaf's active tab changed.
    ActiveFileChanged {
        /// Owning window.
        window: WindowId,
        /// The leaf whose active tab changed.
        leaf: NodeId,
        /// The new active path, if any tab remains.
        path: Option<PathBuf>,
    },
    /// A leaf was created (by a split or as a replacement root).
    LeafCreated {
        /// Owning window.
        window: WindowId,
        /// The new leaf.
        leaf: NodeId,
    },
    /// A leaf was removed (closed or collapsed).
    LeafDeleted {
        /// Owning window.
        window: WindowId,
        /// The removed leaf.
        leaf: NodeId,
    },
    /// A window and its tree were created.
    WindowCreated {
        /// The new window.
        window: WindowId,
    },
    /// A window and its tree were torn down.
    WindowDeleted {
        /// The removed window.
        window: WindowId,
    },
    /// A window's layout changed shape (split, close, move, resize).
    TreeChanged {
        /// The window whose layout changed.
        window: WindowId,
    },
}

impl AuthorityEvent {
    /// The scope this event is delivered to.
    pub fn scope(&self) -> EventScope {
        match self {
            AuthorityEvent::FileOpened { .. }
            | AuthorityEvent::FileClosed { .. }
            | AuthorityEvent::FileRemotelyChanged { .. }
            | AuthorityEvent::FileSaved { .. }
            | AuthorityEvent::FileStatusChanged { .. }
            | AuthorityEvent::WindowCreated { .. }
            | AuthorityEvent::WindowDeleted { .. } => EventScope::Broadcast,
            AuthorityEvent::FilesSorted { window, .. }
            | AuthorityEvent::ActiveFileChanged { window, .. }
            | AuthorityEvent::LeafCreated { window, .. }
            | AuthorityEvent::LeafDeleted { window, .. }
            | AuthorityEvent::TreeChanged { window } => EventScope::Window(*window),
        }
    }

    /// The event name as it appears in the serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            AuthorityEvent::FileOpened { .. } => "file-opened",
            AuthorityEvent::FileClosed { .. } => "file-closed",
            AuthorityEvent::FileRemotelyChanged { .. } => "file-remotely-changed",
            AuthorityEvent::FileSaved { .. } => "file-saved",
            AuthorityEvent::FileStatusChanged { .. } => "file-status-changed",
            AuthorityEvent::FilesSorted { .. } => "files-sorted",
            AuthorityEvent::ActiveFileChanged { .. } => "active-file-changed",
            AuthorityEvent::LeafCreated { .. } => "leaf-created",
            AuthorityEvent::LeafDeleted { .. } => "leaf-deleted",
            AuthorityEvent::WindowCreated { .. } => "window-created",
            AuthorityEvent::WindowDeleted { .. } => "window-deleted",
            AuthorityEvent::TreeChanged { .. } => "tree-changed",
        }
    }
}
