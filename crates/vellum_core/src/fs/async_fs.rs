//! Async file-access abstraction.
//!
//! `AsyncFileSystem` is object-safe so it can sit behind `dyn` in shells
//! whose file access is inherently async (IndexedDB-backed WASM builds,
//! tokio file I/O). All methods return boxed futures for object safety.
//!
//! Document loads are suspension points for the Authority's event loop;
//! a blocking read here would stall every view, which is exactly what this
//! trait exists to avoid.

use std::future::Future;
use std::io::Result;
use std::path::Path;
use std::pin::Pin;

use super::FileSystem;

/// A boxed future for object-safe async methods.
///
/// On native targets, futures are `Send` for compatibility with
/// multi-threaded runtimes. On WASM there's no `Send` requirement since
/// JavaScript is single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future for object-safe async methods (WASM, no `Send`).
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Async read-side filesystem abstraction.
#[cfg(not(target_arch = "wasm32"))]
pub trait AsyncFileSystem: Send + Sync {
    /// Reads the file content as a string.
    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>>;

    /// Checks if a file exists.
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool>;

    /// Get file modification time as milliseconds since Unix epoch.
    fn get_modified_time<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Option<i64>> {
        Box::pin(async move { None })
    }
}

/// Async read-side filesystem abstraction (WASM version, no `Send + Sync`).
#[cfg(target_arch = "wasm32")]
pub trait AsyncFileSystem {
    /// Reads the file content as a string.
    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>>;

    /// Checks if a file exists.
    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool>;

    /// Get file modification time as milliseconds since Unix epoch.
    fn get_modified_time<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Option<i64>> {
        Box::pin(async move { None })
    }
}

/// Wrapper that adapts a synchronous [`FileSystem`] to [`AsyncFileSystem`].
///
/// Operations complete immediately since the underlying implementation is
/// synchronous; useful for [`InMemoryFileSystem`](super::InMemoryFileSystem)
/// in tests and for `RealFileSystem` where reads are fast local disk.
#[derive(Clone)]
pub struct SyncToAsyncFs<F: FileSystem> {
    inner: F,
}

impl<F: FileSystem> SyncToAsyncFs<F> {
    /// Create a new async wrapper around a synchronous filesystem.
    pub fn new(fs: F) -> Self {
        Self { inner: fs }
    }

    /// Get a reference to the inner synchronous filesystem.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: FileSystem> AsyncFileSystem for SyncToAsyncFs<F> {
    fn read_to_string<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { self.inner.read_to_string(path) })
    }

    fn exists<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.inner.exists(path) })
    }

    fn get_modified_time<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Option<i64>> {
        Box::pin(async move { self.inner.get_modified_time(path) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileSystem;

    #[tokio::test]
    async fn test_sync_to_async_wrapper() {
        let sync_fs = InMemoryFileSystem::new().with_file("/notes/test.md", "# Hello");
        let async_fs = SyncToAsyncFs::new(sync_fs);

        let content = async_fs
            .read_to_string(Path::new("/notes/test.md"))
            .await
            .unwrap();
        assert_eq!(content, "# Hello");

        assert!(async_fs.exists(Path::new("/notes/test.md")).await);
        assert!(!async_fs.exists(Path::new("/notes/missing.md")).await);
    }
}
