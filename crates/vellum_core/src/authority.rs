//! Unified authority API (async-first).
//!
//! `Authority<FS>` is the single process-wide owner of document truth: it
//! composes the store, the long-poll registry, the per-window layout
//! trees, the modification tracker, and the event bus. Views never touch
//! those components directly; everything goes through here (or through the
//! [`Request`](crate::protocol::Request) endpoint built on top).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vellum_core::{Authority, AuthorityConfig};
//! use vellum_core::fs::{RealFileSystem, SyncToAsyncFs};
//!
//! let fs = SyncToAsyncFs::new(RealFileSystem);
//! let authority = Arc::new(Authority::new(fs, AuthorityConfig::default()));
//!
//! let window = authority.create_window();
//! let snapshot = authority.get_document("notes/today.md".as_ref()).await?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::bus::{EventBus, EventCallback, SubscriptionId};
use crate::config::AuthorityConfig;
use crate::dirty::ModificationTracker;
use crate::document::{DocumentSnapshot, Version};
use crate::error::{AuthorityError, Result};
use crate::events::AuthorityEvent;
use crate::fs::AsyncFileSystem;
use crate::store::DocumentStore;
use crate::subscription::{PullOutcome, SubscriptionRegistry, ViewId};
use crate::tree::{DocumentTree, NodeId, OpenDocument, SplitDirection, TreeNode, WindowId};
use crate::update::Update;

/// The process-wide document authority.
pub struct Authority<FS: AsyncFileSystem> {
    store: DocumentStore<FS>,
    subs: SubscriptionRegistry,
    trees: RwLock<HashMap<WindowId, DocumentTree>>,
    /// Views attached to each window; window teardown cancels their pulls.
    window_views: Mutex<HashMap<WindowId, Vec<ViewId>>>,
    tracker: ModificationTracker,
    bus: EventBus,
    next_window: AtomicU64,
    next_view: AtomicU64,
}

impl<FS: AsyncFileSystem> Authority<FS> {
    /// Create an authority over the given file-access collaborator.
    pub fn new(fs: FS, config: AuthorityConfig) -> Self {
        Self {
            store: DocumentStore::new(fs, config),
            subs: SubscriptionRegistry::new(),
            trees: RwLock::new(HashMap::new()),
            window_views: Mutex::new(HashMap::new()),
            tracker: ModificationTracker::new(),
            bus: EventBus::new(),
            next_window: AtomicU64::new(1),
            next_view: AtomicU64::new(1),
        }
    }

    /// Allocate a view identity for a connecting editor view.
    pub fn allocate_view(&self) -> ViewId {
        self.next_view.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a view with a window, so tearing the window down cancels
    /// the view's pending pulls.
    pub fn attach_view(&self, window: WindowId, view: ViewId) -> Result<()> {
        if !self.trees.read().unwrap().contains_key(&window) {
            return Err(AuthorityError::UnknownWindow(window));
        }
        let mut views = self.window_views.lock().unwrap();
        let attached = views.entry(window).or_default();
        if !attached.contains(&view) {
            attached.push(view);
        }
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Subscribe to every authority event.
    pub fn subscribe(&self, callback: EventCallback) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    /// Subscribe to broadcasts plus events scoped to one window.
    pub fn subscribe_window(&self, window: WindowId, callback: EventCallback) -> SubscriptionId {
        self.bus.subscribe_window(window, callback)
    }

    /// Remove an event subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Authoritative snapshot of a document, loading it on first access.
    ///
    /// Emits `file-opened` exactly once per residency.
    pub async fn get_document(&self, path: &Path) -> Result<DocumentSnapshot> {
        let (snapshot, newly_loaded) = self.store.fetch(path).await?;
        if newly_loaded {
            self.bus.emit(&AuthorityEvent::FileOpened {
                path: path.to_path_buf(),
            });
        }
        Ok(snapshot)
    }

    /// Accept (or reject) one pushed edit batch as the next version.
    ///
    /// On acceptance the update is appended, pending pulls on the path are
    /// resolved, and the modification set is updated. A version conflict
    /// surfaces as [`AuthorityError::VersionConflict`]; the protocol layer
    /// turns that into a rejected-push response.
    pub fn push_updates(&self, path: &Path, update: Update) -> Result<Version> {
        let (version, dirty) = self.store.append(path, update)?;

        self.subs
            .wake(path, |from| self.store.since(path, from).unwrap_or_default());

        let changed = if dirty {
            self.tracker.mark_dirty(path)
        } else {
            self.tracker.mark_clean(path)
        };
        if changed {
            self.emit_status();
        }
        Ok(version)
    }

    /// Long-poll for updates strictly after `from_version`.
    ///
    /// Resolves immediately when newer versions already exist. Otherwise
    /// the call suspends until an append lands, the document closes
    /// (`Ok(None)`), or a newer pull from the same view supersedes this one
    /// (also `Ok(None)`). A `from_version` predating the current residency
    /// also resolves `Ok(None)`: the view must re-fetch before pulling.
    pub async fn pull_updates(
        &self,
        view: ViewId,
        path: &Path,
        from_version: Version,
    ) -> Result<Option<Vec<Update>>> {
        // Register before checking the log so an append between the two
        // steps cannot be missed.
        let rx = self.subs.register(view, path, from_version);

        // A version below the residency's baseline (a reopened document)
        // cannot be caught up from the log: the edits are relative to
        // content the view never saw. Same recovery as a closed document.
        match self.store.baseline(path) {
            Ok(baseline) if from_version < baseline => {
                self.subs.cancel(view, path);
                return Ok(None);
            }
            Ok(_) => {}
            Err(err) => {
                self.subs.cancel(view, path);
                return Err(err);
            }
        }

        let pending = match self.store.since(path, from_version) {
            Ok(pending) => pending,
            Err(err) => {
                self.subs.cancel(view, path);
                return Err(err);
            }
        };
        if !pending.is_empty() {
            if self.subs.cancel(view, path) {
                return Ok(Some(pending));
            }
            // Already woken concurrently; the outcome is on the channel.
        }

        match rx.await {
            Ok(PullOutcome::Updates(updates)) => Ok(Some(updates)),
            Ok(PullOutcome::Invalidated) => Ok(None),
            // Superseded or cancelled.
            Err(_) => Ok(None),
        }
    }

    /// Cancel a view's pending pull on one path.
    pub fn cancel_pull(&self, view: ViewId, path: &Path) -> bool {
        self.subs.cancel(view, path)
    }

    /// Drop every pending pull of a disconnecting view and detach it from
    /// its window.
    pub fn disconnect_view(&self, view: ViewId) {
        self.subs.cancel_view(view);
        let mut views = self.window_views.lock().unwrap();
        views.retain(|_, attached| {
            attached.retain(|v| *v != view);
            !attached.is_empty()
        });
    }

    /// Record that the external save pipeline persisted a document.
    pub fn mark_saved(&self, path: &Path) -> Result<()> {
        let was_dirty = self.store.mark_saved(path)?;
        if was_dirty && self.tracker.mark_clean(path) {
            self.emit_status();
        }
        self.bus.emit(&AuthorityEvent::FileSaved {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Absorb an external (watcher-reported) change to a document's file.
    ///
    /// The disk content becomes the authoritative buffer via a regular
    /// whole-buffer update, so pending pulls converge without a re-fetch.
    /// Returns true when the buffer actually changed.
    pub fn notify_remote_change(&self, path: &Path, new_content: &str) -> Result<bool> {
        let update = self.store.apply_remote_change(path, new_content)?;
        // Disk and buffer now agree either way.
        if self.tracker.mark_clean(path) {
            self.emit_status();
        }
        let Some(_) = update else { return Ok(false) };

        self.subs
            .wake(path, |from| self.store.since(path, from).unwrap_or_default());
        self.bus.emit(&AuthorityEvent::FileRemotelyChanged {
            path: path.to_path_buf(),
        });
        Ok(true)
    }

    /// Evict a document: resolve its pending pulls as invalidated, remove
    /// its tabs from every window, and clear its modification state.
    pub fn close_document(&self, path: &Path) -> Result<Version> {
        let last = self.store.close(path)?;
        self.subs.invalidate(path);
        if self.tracker.mark_clean(path) {
            self.emit_status();
        }
        self.remove_tabs_everywhere(path);
        self.bus.emit(&AuthorityEvent::FileClosed {
            path: path.to_path_buf(),
        });
        Ok(last)
    }

    /// Paths of open documents with unsaved modifications.
    pub fn modification_status(&self) -> Vec<PathBuf> {
        self.tracker.snapshot()
    }

    /// Whether one document has unsaved modifications.
    pub fn is_dirty(&self, path: &Path) -> bool {
        self.tracker.is_dirty(path)
    }

    fn emit_status(&self) {
        self.bus.emit(&AuthorityEvent::FileStatusChanged {
            modified: self.tracker.snapshot(),
        });
    }

    fn remove_tabs_everywhere(&self, path: &Path) {
        let mut deleted_leaves = Vec::new();
        let mut changed_windows = Vec::new();
        {
            let mut trees = self.trees.write().unwrap();
            for (window, tree) in trees.iter_mut() {
                let mut changed = false;
                for leaf in tree.leaves_showing(path) {
                    if let Ok(removal) = tree.close_tab(leaf, path) {
                        changed = true;
                        if let Some(leaf) = removal.deleted_leaf {
                            deleted_leaves.push((*window, leaf));
                        }
                    }
                }
                if changed {
                    changed_windows.push(*window);
                }
            }
        }
        // Emit outside the tree lock; callbacks may call back in.
        for (window, leaf) in deleted_leaves {
            self.bus.emit(&AuthorityEvent::LeafDeleted { window, leaf });
        }
        for window in changed_windows {
            self.bus.emit(&AuthorityEvent::TreeChanged { window });
        }
    }

    // ========================================================================
    // Windows and layout
    // ========================================================================

    /// Create a window with a fresh single-leaf tree.
    pub fn create_window(&self) -> WindowId {
        let window = self.next_window.fetch_add(1, Ordering::SeqCst);
        self.trees
            .write()
            .unwrap()
            .insert(window, DocumentTree::new(window));
        self.bus.emit(&AuthorityEvent::WindowCreated { window });
        window
    }

    /// Create a window from a persisted tree layout.
    pub fn restore_window(&self, json: &str) -> Result<WindowId> {
        let window = self.next_window.fetch_add(1, Ordering::SeqCst);
        let tree = DocumentTree::from_json(window, json)?;
        self.trees.write().unwrap().insert(window, tree);
        self.bus.emit(&AuthorityEvent::WindowCreated { window });
        Ok(window)
    }

    /// Tear down a window and its tree, cancelling the pending pulls of
    /// every view attached to it. Documents stay resident; other windows
    /// may still show them.
    pub fn close_window(&self, window: WindowId) -> Result<()> {
        self.trees
            .write()
            .unwrap()
            .remove(&window)
            .ok_or(AuthorityError::UnknownWindow(window))?;
        let attached = self.window_views.lock().unwrap().remove(&window);
        if let Some(attached) = attached {
            for view in attached {
                self.subs.cancel_view(view);
            }
        }
        self.bus.emit(&AuthorityEvent::WindowDeleted { window });
        Ok(())
    }

    /// A window's current layout, for rendering or persistence.
    pub fn tab_config(&self, window: WindowId) -> Result<TreeNode> {
        let trees = self.trees.read().unwrap();
        let tree = trees
            .get(&window)
            .ok_or(AuthorityError::UnknownWindow(window))?;
        Ok(tree.root().clone())
    }

    /// A window's layout as persisted JSON.
    pub fn tree_json(&self, window: WindowId) -> Result<String> {
        let trees = self.trees.read().unwrap();
        let tree = trees
            .get(&window)
            .ok_or(AuthorityError::UnknownWindow(window))?;
        tree.to_json()
    }

    fn with_tree<T>(
        &self,
        window: WindowId,
        f: impl FnOnce(&mut DocumentTree) -> Result<T>,
    ) -> Result<T> {
        let mut trees = self.trees.write().unwrap();
        let tree = trees
            .get_mut(&window)
            .ok_or(AuthorityError::UnknownWindow(window))?;
        f(tree)
    }

    /// Split a leaf; the new sibling starts with a copy of the active tab.
    pub fn split_leaf(
        &self,
        window: WindowId,
        leaf: NodeId,
        direction: SplitDirection,
    ) -> Result<(NodeId, [NodeId; 2])> {
        let result = self.with_tree(window, |tree| tree.split_leaf(leaf, direction))?;
        let (_, [_, new_leaf]) = result;
        self.bus.emit(&AuthorityEvent::LeafCreated {
            window,
            leaf: new_leaf,
        });
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        Ok(result)
    }

    /// Close a leaf, collapsing its parent branch if left unary.
    pub fn close_leaf(&self, window: WindowId, leaf: NodeId) -> Result<()> {
        let replacement = self.with_tree(window, |tree| tree.close_leaf(leaf))?;
        self.bus.emit(&AuthorityEvent::LeafDeleted { window, leaf });
        if let Some(fresh) = replacement {
            self.bus.emit(&AuthorityEvent::LeafCreated {
                window,
                leaf: fresh,
            });
        }
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        Ok(())
    }

    /// Move a tab between (or within) leaves; an emptied source collapses.
    pub fn move_tab(
        &self,
        window: WindowId,
        from_leaf: NodeId,
        to_leaf: NodeId,
        path: &Path,
        index: usize,
    ) -> Result<()> {
        let removal =
            self.with_tree(window, |tree| tree.move_tab(from_leaf, to_leaf, path, index))?;
        if let Some(leaf) = removal.deleted_leaf {
            self.bus.emit(&AuthorityEvent::LeafDeleted { window, leaf });
        }
        self.bus.emit(&AuthorityEvent::ActiveFileChanged {
            window,
            leaf: to_leaf,
            path: Some(path.to_path_buf()),
        });
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        Ok(())
    }

    /// Replace a branch's child sizes. Invalid size vectors are rejected
    /// and the layout is untouched.
    pub fn resize(&self, window: WindowId, branch: NodeId, sizes: Vec<f64>) -> Result<()> {
        self.with_tree(window, |tree| tree.resize(branch, sizes))?;
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        Ok(())
    }

    /// Open a document in a leaf's tab strip and focus it. Loads the
    /// document if it is not yet resident.
    pub async fn open_in_leaf(&self, window: WindowId, leaf: NodeId, path: &Path) -> Result<()> {
        self.get_document(path).await?;
        self.with_tree(window, |tree| {
            tree.open_in_leaf(leaf, OpenDocument::new(path))
        })?;
        self.bus.emit(&AuthorityEvent::ActiveFileChanged {
            window,
            leaf,
            path: Some(path.to_path_buf()),
        });
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        Ok(())
    }

    /// Close one tab. The neighbor becomes active; an emptied non-root
    /// leaf collapses. A document no longer shown anywhere is evicted.
    pub fn close_tab(&self, window: WindowId, leaf: NodeId, path: &Path) -> Result<()> {
        let removal = self.with_tree(window, |tree| tree.close_tab(leaf, path))?;
        if let Some(leaf) = removal.deleted_leaf {
            self.bus.emit(&AuthorityEvent::LeafDeleted { window, leaf });
        }
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        self.evict_unshown(&[path.to_path_buf()])
    }

    /// Close every unpinned tab in a leaf except `keep`; pinned tabs stay.
    /// Closed documents no longer shown anywhere are evicted. Returns the
    /// number of tabs closed.
    pub fn close_other_tabs(&self, window: WindowId, leaf: NodeId, keep: &Path) -> Result<usize> {
        let removed = self.with_tree(window, |tree| tree.close_other_tabs(leaf, keep))?;
        if removed.is_empty() {
            return Ok(0);
        }
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        self.evict_unshown(&removed)?;
        Ok(removed.len())
    }

    /// Close every unpinned tab in a leaf. Pinned tabs keep the leaf
    /// alive; an emptied non-root leaf collapses. Closed documents no
    /// longer shown anywhere are evicted. Returns the number of tabs
    /// closed.
    pub fn close_all_tabs(&self, window: WindowId, leaf: NodeId) -> Result<usize> {
        let (removed, removal) = self.with_tree(window, |tree| tree.close_all_tabs(leaf))?;
        if let Some(leaf) = removal.deleted_leaf {
            self.bus.emit(&AuthorityEvent::LeafDeleted { window, leaf });
        }
        self.bus.emit(&AuthorityEvent::TreeChanged { window });
        self.evict_unshown(&removed)?;
        Ok(removed.len())
    }

    fn evict_unshown(&self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            let still_shown = {
                let trees = self.trees.read().unwrap();
                trees.values().any(|t| !t.leaves_showing(path).is_empty())
            };
            if !still_shown && self.store.contains(path) {
                self.close_document(path)?;
            }
        }
        Ok(())
    }

    /// Make a path the active tab of a leaf.
    pub fn set_active(&self, window: WindowId, leaf: NodeId, path: &Path) -> Result<()> {
        self.with_tree(window, |tree| tree.set_active(leaf, path))?;
        self.bus.emit(&AuthorityEvent::ActiveFileChanged {
            window,
            leaf,
            path: Some(path.to_path_buf()),
        });
        Ok(())
    }

    /// Sort a leaf's tabs (pinned first, then file name).
    pub fn sort_tabs(&self, window: WindowId, leaf: NodeId) -> Result<()> {
        self.with_tree(window, |tree| tree.sort_tabs(leaf))?;
        self.bus.emit(&AuthorityEvent::FilesSorted { window, leaf });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{InMemoryFileSystem, SyncToAsyncFs};
    use crate::update::TextEdit;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    fn authority_with(
        files: &[(&str, &str)],
    ) -> Authority<SyncToAsyncFs<InMemoryFileSystem>> {
        let mut fs = InMemoryFileSystem::new();
        for (path, content) in files {
            fs = fs.with_file(path, content);
        }
        Authority::new(SyncToAsyncFs::new(fs), AuthorityConfig::default())
    }

    fn record_events<FS: AsyncFileSystem>(
        authority: &Authority<FS>,
    ) -> Arc<StdMutex<Vec<String>>> {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        authority.subscribe(Arc::new(move |event| {
            sink.lock().unwrap().push(event.event_type().to_string());
        }));
        events
    }

    #[tokio::test]
    async fn test_get_document_emits_file_opened_once() {
        let authority = authority_with(&[("/a.md", "A")]);
        let events = record_events(&authority);

        authority.get_document(Path::new("/a.md")).await.unwrap();
        authority.get_document(Path::new("/a.md")).await.unwrap();

        let seen = events.lock().unwrap();
        assert_eq!(
            seen.iter().filter(|e| *e == "file-opened").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_push_wakes_pending_pull() {
        let authority = Arc::new(authority_with(&[("/a.md", "A")]));
        authority.get_document(Path::new("/a.md")).await.unwrap();

        let puller = Arc::clone(&authority);
        let pull = tokio::spawn(async move {
            puller.pull_updates(1, Path::new("/a.md"), 1).await
        });
        tokio::task::yield_now().await;

        authority
            .push_updates(Path::new("/a.md"), Update::single(2, TextEdit::insert(1, "B")))
            .unwrap();

        let updates = pull.await.unwrap().unwrap().expect("updates");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].version, 2);
    }

    #[tokio::test]
    async fn test_pull_resolves_immediately_when_behind() {
        let authority = authority_with(&[("/a.md", "A")]);
        authority.get_document(Path::new("/a.md")).await.unwrap();
        authority
            .push_updates(Path::new("/a.md"), Update::single(2, TextEdit::insert(1, "B")))
            .unwrap();

        let updates = authority
            .pull_updates(1, Path::new("/a.md"), 1)
            .await
            .unwrap()
            .expect("updates");
        assert_eq!(updates[0].version, 2);
    }

    #[tokio::test]
    async fn test_pull_on_unopened_document_is_not_found() {
        let authority = authority_with(&[]);
        let err = authority
            .pull_updates(1, Path::new("/a.md"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorityError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_close_document_invalidates_pulls_and_tabs() {
        let authority = Arc::new(authority_with(&[("/a.md", "A")]));
        let window = authority.create_window();
        let leaf = authority.tab_config(window).unwrap().id();
        authority.open_in_leaf(window, leaf, Path::new("/a.md")).await.unwrap();

        let puller = Arc::clone(&authority);
        let pull = tokio::spawn(async move {
            puller.pull_updates(1, Path::new("/a.md"), 1).await
        });
        tokio::task::yield_now().await;

        authority.close_document(Path::new("/a.md")).unwrap();
        assert!(pull.await.unwrap().unwrap().is_none());

        // The tab is gone from the window's tree.
        match authority.tab_config(window).unwrap() {
            TreeNode::Leaf { open_files, .. } => assert!(open_files.is_empty()),
            _ => panic!("expected leaf root"),
        }
    }

    #[tokio::test]
    async fn test_dirty_set_follows_push_and_save() {
        let authority = authority_with(&[("/a.md", "A")]);
        authority.get_document(Path::new("/a.md")).await.unwrap();
        assert!(authority.modification_status().is_empty());

        authority
            .push_updates(Path::new("/a.md"), Update::single(2, TextEdit::insert(1, "B")))
            .unwrap();
        assert_eq!(authority.modification_status(), vec![PathBuf::from("/a.md")]);

        authority.mark_saved(Path::new("/a.md")).unwrap();
        assert!(authority.modification_status().is_empty());
    }

    #[tokio::test]
    async fn test_remote_change_wakes_pull_with_replacement() {
        let authority = Arc::new(authority_with(&[("/a.md", "A")]));
        authority.get_document(Path::new("/a.md")).await.unwrap();

        let puller = Arc::clone(&authority);
        let pull = tokio::spawn(async move {
            puller.pull_updates(1, Path::new("/a.md"), 1).await
        });
        tokio::task::yield_now().await;

        assert!(authority
            .notify_remote_change(Path::new("/a.md"), "rewritten")
            .unwrap());

        let updates = pull.await.unwrap().unwrap().expect("updates");
        let replayed = updates
            .iter()
            .try_fold("A".to_string(), |acc, u| u.apply_to(&acc))
            .unwrap();
        assert_eq!(replayed, "rewritten");
    }

    #[tokio::test]
    async fn test_close_tab_evicts_unshown_document() {
        let authority = authority_with(&[("/a.md", "A")]);
        let window = authority.create_window();
        let leaf = authority.tab_config(window).unwrap().id();
        authority.open_in_leaf(window, leaf, Path::new("/a.md")).await.unwrap();

        authority.close_tab(window, leaf, Path::new("/a.md")).unwrap();
        // Re-fetch performs a fresh load with a higher baseline.
        let snap = authority.get_document(Path::new("/a.md")).await.unwrap();
        assert!(snap.version > 1);
    }

    #[tokio::test]
    async fn test_close_other_tabs_evicts_unshown() {
        let authority = authority_with(&[("/a.md", "A"), ("/b.md", "B")]);
        let window = authority.create_window();
        let leaf = authority.tab_config(window).unwrap().id();
        authority.open_in_leaf(window, leaf, Path::new("/a.md")).await.unwrap();
        authority.open_in_leaf(window, leaf, Path::new("/b.md")).await.unwrap();

        let closed = authority
            .close_other_tabs(window, leaf, Path::new("/a.md"))
            .unwrap();
        assert_eq!(closed, 1);

        // /b.md was evicted; re-fetch reloads above the old head.
        assert!(authority.get_document(Path::new("/b.md")).await.unwrap().version > 1);
        // /a.md kept its residency.
        assert_eq!(authority.get_document(Path::new("/a.md")).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_close_all_tabs_spares_pinned() {
        let authority = authority_with(&[]);
        let json = r#"{"type":"leaf","id":1,
            "open_files":[{"path":"/keep.md","pinned":true},{"path":"/a.md"}],
            "active_file":"/a.md"}"#;
        let window = authority.restore_window(json).unwrap();

        let closed = authority.close_all_tabs(window, 1).unwrap();
        assert_eq!(closed, 1);

        match authority.tab_config(window).unwrap() {
            TreeNode::Leaf {
                open_files,
                active_file,
                ..
            } => {
                assert_eq!(open_files.len(), 1);
                assert!(open_files[0].pinned);
                assert_eq!(active_file, Some(PathBuf::from("/keep.md")));
            }
            _ => panic!("expected leaf root"),
        }
    }

    #[tokio::test]
    async fn test_pull_below_residency_baseline_resolves_empty() {
        let authority = authority_with(&[("/a.md", "A")]);
        authority.get_document(Path::new("/a.md")).await.unwrap();
        authority
            .push_updates(Path::new("/a.md"), Update::single(2, TextEdit::insert(1, "B")))
            .unwrap();
        authority.close_document(Path::new("/a.md")).unwrap();

        // Reopen: the residency reseeds above every version handed out.
        let snap = authority.get_document(Path::new("/a.md")).await.unwrap();
        assert_eq!(snap.version, 3);

        // A view still holding a pre-reopen version cannot be caught up
        // from the log; it must re-fetch instead of replaying.
        assert!(authority
            .pull_updates(1, Path::new("/a.md"), 1)
            .await
            .unwrap()
            .is_none());
        // A pull at the residency's own version parks as usual.
        assert_eq!(authority.store.baseline(Path::new("/a.md")).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_window_lifecycle_and_scoped_events() {
        let authority = authority_with(&[]);
        let window = authority.create_window();

        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        authority.subscribe_window(window, Arc::new(move |event| {
            sink.lock().unwrap().push(event.event_type().to_string());
        }));

        // A scoped event for an unrelated window is not delivered.
        let other = authority.create_window();
        let other_leaf = authority.tab_config(other).unwrap().id();
        authority.sort_tabs(other, other_leaf).unwrap();

        authority.close_window(other).unwrap();
        assert!(matches!(
            authority.close_window(other),
            Err(AuthorityError::UnknownWindow(_))
        ));

        let seen = events.lock().unwrap();
        assert!(seen.contains(&"window-created".to_string()));
        assert!(seen.contains(&"window-deleted".to_string()));
        assert!(!seen.contains(&"files-sorted".to_string()));
    }

    #[tokio::test]
    async fn test_restore_window_roundtrip() {
        let authority = authority_with(&[("/a.md", "A")]);
        let window = authority.create_window();
        let leaf = authority.tab_config(window).unwrap().id();
        authority.open_in_leaf(window, leaf, Path::new("/a.md")).await.unwrap();
        authority
            .split_leaf(window, leaf, SplitDirection::Horizontal)
            .unwrap();

        let json = authority.tree_json(window).unwrap();
        let restored = authority.restore_window(&json).unwrap();
        assert_eq!(
            authority.tab_config(restored).unwrap(),
            authority.tab_config(window).unwrap()
        );
    }
}
