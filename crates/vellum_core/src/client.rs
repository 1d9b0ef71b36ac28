//! Typed in-process client handle.
//!
//! An [`AuthorityClient`] pairs a shared [`Authority`] with a view
//! identity, giving each editor view one typed method per protocol
//! operation without hand-building [`Request`](crate::protocol::Request)
//! values. Dropping the client cancels its pending pulls, so a view that
//! goes away cannot leak parked long-polls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::authority::Authority;
use crate::document::{DocumentSnapshot, Version};
use crate::error::Result;
use crate::fs::AsyncFileSystem;
use crate::protocol::{Request, Response};
use crate::subscription::ViewId;
use crate::tree::{TreeNode, WindowId};
use crate::update::{TextEdit, Update};

impl<FS: AsyncFileSystem> Authority<FS> {
    /// Connect a new view, allocating it a fresh identity.
    pub fn connect(self: &Arc<Self>) -> AuthorityClient<FS> {
        AuthorityClient {
            view: self.allocate_view(),
            authority: Arc::clone(self),
        }
    }

    /// Connect a new view attached to a window: closing the window cancels
    /// the view's pending pulls, in addition to the cancellation the
    /// client's own `Drop` performs.
    pub fn connect_to(self: &Arc<Self>, window: WindowId) -> Result<AuthorityClient<FS>> {
        let client = self.connect();
        self.attach_view(window, client.view())?;
        Ok(client)
    }
}

/// A view's handle onto the authority.
pub struct AuthorityClient<FS: AsyncFileSystem> {
    authority: Arc<Authority<FS>>,
    view: ViewId,
}

impl<FS: AsyncFileSystem> AuthorityClient<FS> {
    /// This client's view identity.
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Fetch the authoritative snapshot, loading the document if needed.
    pub async fn get_document(&self, path: &Path) -> Result<DocumentSnapshot> {
        self.authority.get_document(path).await
    }

    /// Push one edit batch as `version`.
    ///
    /// Returns `Some(new_version)` when accepted. `None` means the push
    /// raced with another writer and lost; re-fetch (or pull) and rebase.
    pub fn push_updates(
        &self,
        path: &Path,
        version: Version,
        edits: Vec<TextEdit>,
    ) -> Result<Option<Version>> {
        match self.authority.push_updates(path, Update { version, edits }) {
            Ok(version) => Ok(Some(version)),
            Err(err) if err.is_recoverable() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Long-poll for updates strictly after `version`.
    ///
    /// `Ok(None)` means the wait ended without updates (document closed,
    /// a newer pull from this view superseded the wait, or `version`
    /// predates the document's current residency); re-fetch before
    /// pulling again.
    pub async fn pull_updates(
        &self,
        path: &Path,
        version: Version,
    ) -> Result<Option<Vec<Update>>> {
        self.authority.pull_updates(self.view, path, version).await
    }

    /// Cancel this view's pending pull on one path.
    pub fn cancel_pull(&self, path: &Path) -> bool {
        self.authority.cancel_pull(self.view, path)
    }

    /// Paths of open documents with unsaved modifications.
    pub fn modification_status(&self) -> Vec<PathBuf> {
        self.authority.modification_status()
    }

    /// A window's split/tab layout.
    pub fn tab_config(&self, window: WindowId) -> Result<TreeNode> {
        self.authority.tab_config(window)
    }

    /// Execute a raw protocol request as this view.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.authority.execute(self.view, request).await
    }
}

impl<FS: AsyncFileSystem> Drop for AuthorityClient<FS> {
    fn drop(&mut self) {
        self.authority.disconnect_view(self.view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthorityConfig;
    use crate::fs::{InMemoryFileSystem, SyncToAsyncFs};

    fn shared_authority(
        files: &[(&str, &str)],
    ) -> Arc<Authority<SyncToAsyncFs<InMemoryFileSystem>>> {
        let mut fs = InMemoryFileSystem::new();
        for (path, content) in files {
            fs = fs.with_file(path, content);
        }
        Arc::new(Authority::new(
            SyncToAsyncFs::new(fs),
            AuthorityConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_clients_get_distinct_views() {
        let authority = shared_authority(&[]);
        let a = authority.connect();
        let b = authority.connect();
        assert_ne!(a.view(), b.view());
    }

    #[tokio::test]
    async fn test_rejected_push_is_none() {
        let authority = shared_authority(&[("/a.md", "A")]);
        let writer = authority.connect();
        let racer = authority.connect();

        let snap = writer.get_document(Path::new("/a.md")).await.unwrap();
        racer.get_document(Path::new("/a.md")).await.unwrap();

        let accepted = writer
            .push_updates(Path::new("/a.md"), snap.version + 1, vec![TextEdit::insert(1, "B")])
            .unwrap();
        assert_eq!(accepted, Some(2));

        // Same base version from the other view: rejected, not an error.
        let rejected = racer
            .push_updates(Path::new("/a.md"), snap.version + 1, vec![TextEdit::insert(0, "Z")])
            .unwrap();
        assert_eq!(rejected, None);
    }

    #[tokio::test]
    async fn test_close_window_cancels_attached_views_pulls() {
        let authority = shared_authority(&[("/a.md", "A")]);
        let window = authority.create_window();
        let client = authority.connect_to(window).unwrap();
        client.get_document(Path::new("/a.md")).await.unwrap();
        let view = client.view();

        let pull_authority = Arc::clone(&authority);
        let pull = tokio::spawn(async move {
            pull_authority.pull_updates(view, Path::new("/a.md"), 1).await
        });
        tokio::task::yield_now().await;

        // Tearing down the window cancels the attached view's parked pull
        // even though the client itself is still alive.
        authority.close_window(window).unwrap();
        assert!(pull.await.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_to_unknown_window_rejected() {
        let authority = shared_authority(&[]);
        assert!(matches!(
            authority.connect_to(999),
            Err(crate::error::AuthorityError::UnknownWindow(999))
        ));
    }

    #[tokio::test]
    async fn test_drop_cancels_pending_pull() {
        let authority = shared_authority(&[("/a.md", "A")]);
        let client = authority.connect();
        client.get_document(Path::new("/a.md")).await.unwrap();
        let view = client.view();

        let pull_authority = Arc::clone(&authority);
        let pull = tokio::spawn(async move {
            pull_authority.pull_updates(view, Path::new("/a.md"), 1).await
        });
        tokio::task::yield_now().await;

        drop(client);
        // The parked pull resolves empty instead of leaking.
        assert!(pull.await.unwrap().unwrap().is_none());
    }
}
