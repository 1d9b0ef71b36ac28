//! Sync protocol request/response types.
//!
//! The wire surface of the authority: every message is serializable so the
//! same endpoint serves IPC, WASM, and in-process callers. Requests carry a
//! `type` tag with their fields under `params`; responses are tagged the
//! same way.
//!
//! ```ignore
//! use vellum_core::{Request, Response};
//!
//! let req = Request::PullUpdates { path: "notes/a.md".into(), version: 3 };
//! let response = authority.execute(view, req).await?;
//!
//! if let Response::PullResult { updates: Some(updates) } = response {
//!     // apply updates in order
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{DocumentSnapshot, Version};
use crate::tree::{TreeNode, WindowId};
use crate::update::{TextEdit, Update};

/// All requests a view can issue against the authority.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "params")]
pub enum Request {
    /// Fetch the authoritative snapshot of a document, loading it if
    /// needed.
    GetDocument {
        /// Path of the document.
        path: PathBuf,
    },

    /// Push one local edit batch as the next version.
    PushUpdates {
        /// Path of the document.
        path: PathBuf,
        /// Proposed version; accepted only if exactly current + 1.
        version: Version,
        /// Edits to apply in order.
        edits: Vec<TextEdit>,
    },

    /// Long-poll for updates after `version`. Resolves immediately when
    /// newer versions exist, otherwise parks until one lands.
    PullUpdates {
        /// Path of the document.
        path: PathBuf,
        /// The version the view has already applied.
        version: Version,
    },

    /// List every open document with unsaved modifications.
    GetFileModificationStatus,

    /// Fetch a window's split/tab layout for rendering or persistence.
    RetrieveTabConfig {
        /// The window whose tree is wanted.
        window: WindowId,
    },
}

/// Responses paired with [`Request`] variants.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "params")]
pub enum Response {
    /// Snapshot for `GetDocument`.
    Document(DocumentSnapshot),

    /// Verdict for `PushUpdates`. A rejected push is a normal response,
    /// not an error: the view re-pulls and rebases.
    PushResult {
        /// Whether the push became the new head.
        accepted: bool,
        /// The authoritative current version (the new head when accepted,
        /// the version to rebase onto when not).
        version: Version,
    },

    /// Resolution of `PullUpdates`. `None` means the wait ended without
    /// updates (document closed, the pull was superseded, or the pulled
    /// version predates the document's current residency); the view
    /// re-fetches before pulling again.
    PullResult {
        /// Ordered updates strictly after the pulled version, or `None`.
        updates: Option<Vec<Update>>,
    },

    /// Answer to `GetFileModificationStatus`.
    ModificationStatus {
        /// Paths with unsaved modifications, in first-dirtied order.
        paths: Vec<PathBuf>,
    },

    /// Answer to `RetrieveTabConfig`.
    TabConfig(TreeNode),
}
