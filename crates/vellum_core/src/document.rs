//! Document identity and classification.
//!
//! A document is keyed by its absolute path. Renames are modeled as
//! remove + add, so the path is a stable identity for the lifetime of a
//! residency in the [`DocumentStore`](crate::store::DocumentStore).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A per-document monotonic counter identifying a point in its edit history.
///
/// Strictly increasing for as long as the document is resident; a reopened
/// document is reseeded above every version observed earlier in the session.
pub type Version = u64;

/// File-type classification derived from the path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Markdown prose (`md`, `markdown`, `mdown`).
    Markdown,
    /// YAML data files (`yml`, `yaml`).
    Yaml,
    /// JSON data files.
    Json,
    /// LaTeX-like code (`tex`, `latex`).
    Tex,
}

impl DocumentType {
    /// Classify a path by extension.
    ///
    /// Returns `None` for unknown extensions; the store decides whether
    /// those fall back to Markdown (a writing app treats stray text files
    /// as prose).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" | "mdown" => Some(Self::Markdown),
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "tex" | "latex" => Some(Self::Tex),
            _ => None,
        }
    }
}

/// The authoritative snapshot of a document returned by `get-document`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DocumentSnapshot {
    /// Absolute path identifying the document.
    pub path: PathBuf,
    /// Full text content at `version`.
    pub content: String,
    /// File-type classification.
    pub doc_type: DocumentType,
    /// Version the content corresponds to.
    pub version: Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_markdown_variants() {
        for name in ["a.md", "b.markdown", "c.mdown", "D.MD"] {
            assert_eq!(
                DocumentType::from_path(Path::new(name)),
                Some(DocumentType::Markdown),
                "failed for {name}"
            );
        }
    }

    #[test]
    fn test_classify_data_and_code() {
        assert_eq!(
            DocumentType::from_path(Path::new("config.yaml")),
            Some(DocumentType::Yaml)
        );
        assert_eq!(
            DocumentType::from_path(Path::new("data.json")),
            Some(DocumentType::Json)
        );
        assert_eq!(
            DocumentType::from_path(Path::new("thesis.tex")),
            Some(DocumentType::Tex)
        );
    }

    #[test]
    fn test_unknown_extension_is_none() {
        assert_eq!(DocumentType::from_path(Path::new("notes.txt")), None);
        assert_eq!(DocumentType::from_path(Path::new("no_extension")), None);
    }
}
