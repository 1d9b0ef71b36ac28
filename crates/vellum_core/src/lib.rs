#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Unified Authority API (the main entry point)
pub mod authority;

/// Event delivery to subscribed callbacks
pub mod bus;

/// Typed per-view client handle
pub mod client;

/// Configuration options
pub mod config;

/// Unsaved-change tracking
pub mod dirty;

/// Document snapshots and classification
pub mod document;

/// Error (common error types)
pub mod error;

/// Authority event types
pub mod events;

/// Filesystem abstraction (read side)
pub mod fs;

/// Sync protocol request/response types
pub mod protocol;

/// Request dispatch for the protocol endpoint
pub mod request_handler;

/// Authoritative document store
pub mod store;

/// Pending long-poll registry
pub mod subscription;

/// Per-window split layout and tab strips
pub mod tree;

/// Versioned edit batches
pub mod update;

/// Gapless per-document update history
pub mod update_log;

pub use authority::Authority;
pub use client::AuthorityClient;
pub use config::AuthorityConfig;
pub use document::{DocumentSnapshot, DocumentType, Version};
pub use error::{AuthorityError, Result, SerializableError};
pub use events::AuthorityEvent;
pub use protocol::{Request, Response};
pub use tree::{DocumentTree, NodeId, OpenDocument, SplitDirection, TreeNode, WindowId};
pub use update::{TextEdit, Update};
