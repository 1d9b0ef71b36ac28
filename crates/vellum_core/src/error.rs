use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::document::Version;
use crate::tree::{NodeId, WindowId};

/// Unified error type for Document Authority operations
#[derive(Debug, Error)]
pub enum AuthorityError {
    // Sync errors
    /// A push lost the race: its version is not the next in the document's
    /// gapless history.
    #[error("version conflict on '{path}': expected {expected}, got {got}")]
    VersionConflict {
        /// The document being pushed to.
        path: PathBuf,
        /// The only version the store would have accepted.
        expected: Version,
        /// The version the caller pushed.
        got: Version,
    },

    /// An update's edits could not be applied to the current content.
    #[error("malformed update for version {version}: {reason}")]
    InvalidUpdate {
        /// The version the update claimed.
        version: Version,
        /// What made the edits inapplicable.
        reason: String,
    },

    // Store errors
    /// The document is not resident in the store.
    #[error("document not open: '{0}'")]
    NotFound(PathBuf),

    /// Reading the document from the filesystem failed.
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    // Layout errors
    /// A tree operation would produce an invalid layout.
    #[error("invalid layout request: {0}")]
    InvalidLayout(String),

    /// No tree exists for this window.
    #[error("no such window: {0}")]
    UnknownWindow(WindowId),

    /// No node with this id exists in the window's tree.
    #[error("no such node: {0}")]
    UnknownNode(NodeId),

    // Config errors
    /// The configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // Serialization errors (tree persistence)
    /// JSON (de)serialization of a persisted layout failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Document Authority operations
pub type Result<T> = std::result::Result<T, AuthorityError>;

impl AuthorityError {
    /// Returns true for errors a client recovers from by re-fetching and
    /// rebasing, rather than surfacing to the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AuthorityError::VersionConflict { .. })
    }

    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}

/// A serializable representation of AuthorityError for the message boundary
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Associated path (if applicable)
    pub path: Option<PathBuf>,
}

impl From<&AuthorityError> for SerializableError {
    fn from(err: &AuthorityError) -> Self {
        let kind = match err {
            AuthorityError::VersionConflict { .. } => "VersionConflict",
            AuthorityError::InvalidUpdate { .. } => "InvalidUpdate",
            AuthorityError::NotFound(_) => "NotFound",
            AuthorityError::FileRead { .. } => "FileRead",
            AuthorityError::InvalidLayout(_) => "InvalidLayout",
            AuthorityError::UnknownWindow(_) => "UnknownWindow",
            AuthorityError::UnknownNode(_) => "UnknownNode",
            AuthorityError::ConfigParse(_) => "ConfigParse",
            AuthorityError::ConfigSerialize(_) => "ConfigSerialize",
            AuthorityError::Json(_) => "Json",
        }
        .to_string();

        let path = match err {
            AuthorityError::VersionConflict { path, .. } => Some(path.clone()),
            AuthorityError::NotFound(path) => Some(path.clone()),
            AuthorityError::FileRead { path, .. } => Some(path.clone()),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            path,
        }
    }
}

impl From<AuthorityError> for SerializableError {
    fn from(err: AuthorityError) -> Self {
        SerializableError::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_is_recoverable() {
        let err = AuthorityError::VersionConflict {
            path: PathBuf::from("/notes/a.md"),
            expected: 4,
            got: 3,
        };
        assert!(err.is_recoverable());
        assert!(!AuthorityError::NotFound(PathBuf::from("/notes/a.md")).is_recoverable());
    }

    #[test]
    fn test_serializable_error_carries_path() {
        let err = AuthorityError::NotFound(PathBuf::from("/notes/a.md"));
        let ser = err.to_serializable();
        assert_eq!(ser.kind, "NotFound");
        assert_eq!(ser.path, Some(PathBuf::from("/notes/a.md")));
        assert!(ser.message.contains("a.md"));
    }

    #[test]
    fn test_serializable_error_without_path() {
        let err = AuthorityError::InvalidLayout("sizes/children mismatch".to_string());
        let ser = err.to_serializable();
        assert_eq!(ser.kind, "InvalidLayout");
        assert!(ser.path.is_none());
    }
}
