//! File-access collaborator boundary.
//!
//! The Authority never walks the disk itself; it asks a [`FileSystem`] (or
//! its async counterpart [`AsyncFileSystem`]) for document content when a
//! fetch finds the path unresident. Writes go through the external save
//! pipeline, not through this trait, so the surface here is read-only.

mod async_fs;
mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;

pub use async_fs::{AsyncFileSystem, BoxFuture, SyncToAsyncFs};
pub use memory::InMemoryFileSystem;
#[cfg(not(target_arch = "wasm32"))]
pub use native::RealFileSystem;

use std::io::Result;
use std::path::Path;

/// Abstraction over the read side of the filesystem.
///
/// Send + Sync required for multi-threaded shells (e.g., Tauri).
pub trait FileSystem: Send + Sync {
    /// Reads the file content as a string.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Checks if a file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Get file modification time as milliseconds since Unix epoch.
    ///
    /// Returns `None` if the file doesn't exist or the modification time
    /// cannot be determined.
    fn get_modified_time(&self, _path: &Path) -> Option<i64> {
        None
    }
}
