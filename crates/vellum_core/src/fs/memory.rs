//! In-memory filesystem for tests and headless use.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::FileSystem;

/// A file entry with content and an optional modification time.
#[derive(Debug, Clone)]
struct Entry {
    content: String,
    modified_ms: Option<i64>,
}

/// An in-memory [`FileSystem`].
///
/// Uses `Arc<Mutex<HashMap>>` for thread-safety and allows cloning while
/// sharing the same underlying file storage, so a test can keep a handle
/// and mutate files behind the Authority's back (simulating the watcher).
#[derive(Clone, Default)]
pub struct InMemoryFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Entry>>>,
}

impl InMemoryFileSystem {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (builder pattern).
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    /// Insert or replace a file.
    pub fn insert(&self, path: &str, content: &str) {
        self.files.lock().unwrap().insert(
            PathBuf::from(path),
            Entry {
                content: content.to_string(),
                modified_ms: None,
            },
        );
    }

    /// Set a file's modification time in milliseconds since the epoch.
    pub fn set_modified_time(&self, path: &str, modified_ms: i64) {
        if let Some(entry) = self.files.lock().unwrap().get_mut(&PathBuf::from(path)) {
            entry.modified_ms = Some(modified_ms);
        }
    }

    /// Get a file's content (for test assertions).
    pub fn get_content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&PathBuf::from(path))
            .map(|e| e.content.clone())
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|e| e.content.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "File not found"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn get_modified_time(&self, path: &Path) -> Option<i64> {
        self.files.lock().unwrap().get(path)?.modified_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_exists() {
        let fs = InMemoryFileSystem::new().with_file("/a.md", "alpha");
        assert_eq!(fs.read_to_string(Path::new("/a.md")).unwrap(), "alpha");
        assert!(fs.exists(Path::new("/a.md")));
        assert!(!fs.exists(Path::new("/b.md")));
        assert!(fs.read_to_string(Path::new("/b.md")).is_err());
    }

    #[test]
    fn test_clone_shares_storage() {
        let fs = InMemoryFileSystem::new();
        let handle = fs.clone();
        handle.insert("/late.md", "added later");
        assert_eq!(fs.get_content("/late.md").as_deref(), Some("added later"));
    }

    #[test]
    fn test_modified_time() {
        let fs = InMemoryFileSystem::new().with_file("/a.md", "alpha");
        assert_eq!(fs.get_modified_time(Path::new("/a.md")), None);
        fs.set_modified_time("/a.md", 1_700_000_000_000);
        assert_eq!(
            fs.get_modified_time(Path::new("/a.md")),
            Some(1_700_000_000_000)
        );
    }
}
