//! Pending long-poll registry.
//!
//! A pull issued at the current version parks here until an append for that
//! path lands, the document is invalidated, or the view cancels. This is
//! deliberately a long-poll rather than a push subscription: the wire stays
//! request/response-shaped, propagation is still near-immediate, and a
//! silent document produces no wakeups.
//!
//! An idle document legitimately leaves a pull pending indefinitely; there
//! are no timeouts here. The leak guard is cancellation: at most one
//! outstanding pull per (view, path), and a disconnecting view drops all of
//! its registrations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::document::Version;
use crate::update::Update;

/// Identity of a requesting editor view.
pub type ViewId = u64;

/// How a parked pull resolved.
#[derive(Debug)]
pub enum PullOutcome {
    /// New updates are available; never empty.
    Updates(Vec<Update>),
    /// The document was closed or replaced while the pull was pending.
    Invalidated,
}

struct Waiter {
    view: ViewId,
    from_version: Version,
    tx: oneshot::Sender<PullOutcome>,
}

/// Per-path set of pending "wait for new version" requests.
#[derive(Default)]
pub struct SubscriptionRegistry {
    pending: Mutex<HashMap<PathBuf, Vec<Waiter>>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a pull for `(view, path)` at `from_version`.
    ///
    /// A still-pending earlier pull from the same view for the same path is
    /// superseded: its sender is dropped, which its receiver observes as a
    /// cancellation. This bounds the pending set to one entry per
    /// (view, path).
    pub fn register(
        &self,
        view: ViewId,
        path: &Path,
        from_version: Version,
    ) -> oneshot::Receiver<PullOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap();
        let waiters = pending.entry(path.to_path_buf()).or_default();
        if let Some(pos) = waiters.iter().position(|w| w.view == view) {
            log::debug!(
                "[Subs] view {view} superseded its pending pull for '{}'",
                path.display()
            );
            waiters.remove(pos);
        }
        waiters.push(Waiter {
            view,
            from_version,
            tx,
        });
        rx
    }

    /// Cancel the pending pull for `(view, path)`, if any.
    pub fn cancel(&self, view: ViewId, path: &Path) -> bool {
        let mut pending = self.pending.lock().unwrap();
        let Some(waiters) = pending.get_mut(path) else {
            return false;
        };
        let before = waiters.len();
        waiters.retain(|w| w.view != view);
        let removed = waiters.len() != before;
        if waiters.is_empty() {
            pending.remove(path);
        }
        removed
    }

    /// Drop every pending pull belonging to `view` (view disconnect).
    pub fn cancel_view(&self, view: ViewId) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let mut removed = 0;
        pending.retain(|_, waiters| {
            let before = waiters.len();
            waiters.retain(|w| w.view != view);
            removed += before - waiters.len();
            !waiters.is_empty()
        });
        if removed > 0 {
            log::debug!("[Subs] cancelled {removed} pending pull(s) for view {view}");
        }
        removed
    }

    /// Resolve every waiter on `path` with the updates since its own
    /// version, as computed by `since`.
    ///
    /// A waiter whose `since` slice comes back empty is left pending rather
    /// than woken with nothing: a resolved pull always carries updates.
    /// Returns the number of waiters woken.
    pub fn wake<F>(&self, path: &Path, since: F) -> usize
    where
        F: Fn(Version) -> Vec<Update>,
    {
        let mut pending = self.pending.lock().unwrap();
        let Some(waiters) = pending.remove(path) else {
            return 0;
        };

        let mut woken = 0;
        let mut keep = Vec::new();
        for waiter in waiters {
            let updates = since(waiter.from_version);
            if updates.is_empty() {
                keep.push(waiter);
            } else {
                // A closed receiver just means the view went away mid-wake.
                let _ = waiter.tx.send(PullOutcome::Updates(updates));
                woken += 1;
            }
        }
        if !keep.is_empty() {
            pending.insert(path.to_path_buf(), keep);
        }

        if woken > 0 {
            log::debug!("[Subs] woke {woken} waiter(s) on '{}'", path.display());
        }
        woken
    }

    /// Resolve every waiter on `path` as invalidated (document closed).
    pub fn invalidate(&self, path: &Path) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let Some(waiters) = pending.remove(path) else {
            return 0;
        };
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.tx.send(PullOutcome::Invalidated);
        }
        if count > 0 {
            log::debug!(
                "[Subs] invalidated {count} waiter(s) on '{}'",
                path.display()
            );
        }
        count
    }

    /// Number of pulls currently pending on `path`.
    pub fn pending_count(&self, path: &Path) -> usize {
        self.pending
            .lock()
            .unwrap()
            .get(path)
            .map_or(0, |w| w.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::TextEdit;

    fn path() -> PathBuf {
        PathBuf::from("/notes/a.md")
    }

    #[tokio::test]
    async fn test_wake_resolves_with_updates() {
        let registry = SubscriptionRegistry::new();
        let rx = registry.register(1, &path(), 3);
        assert_eq!(registry.pending_count(&path()), 1);

        let woken = registry.wake(&path(), |from| {
            assert_eq!(from, 3);
            vec![Update::single(4, TextEdit::insert(0, "B"))]
        });
        assert_eq!(woken, 1);
        assert_eq!(registry.pending_count(&path()), 0);

        match rx.await.unwrap() {
            PullOutcome::Updates(updates) => {
                assert_eq!(updates.len(), 1);
                assert_eq!(updates[0].version, 4);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wake_with_empty_slice_keeps_waiter_pending() {
        let registry = SubscriptionRegistry::new();
        let _rx = registry.register(1, &path(), 7);
        let woken = registry.wake(&path(), |_| Vec::new());
        assert_eq!(woken, 0);
        assert_eq!(registry.pending_count(&path()), 1);
    }

    #[tokio::test]
    async fn test_second_pull_supersedes_first() {
        let registry = SubscriptionRegistry::new();
        let rx1 = registry.register(1, &path(), 3);
        let rx2 = registry.register(1, &path(), 3);
        assert_eq!(registry.pending_count(&path()), 1);

        // The superseded receiver observes a dropped sender.
        assert!(rx1.await.is_err());

        registry.wake(&path(), |_| vec![Update::single(4, TextEdit::insert(0, "x"))]);
        assert!(matches!(rx2.await.unwrap(), PullOutcome::Updates(_)));
    }

    #[tokio::test]
    async fn test_cancel_view_drops_all_registrations() {
        let registry = SubscriptionRegistry::new();
        let other = PathBuf::from("/notes/b.md");
        let rx1 = registry.register(1, &path(), 2);
        let _rx2 = registry.register(2, &path(), 2);
        let rx3 = registry.register(1, &other, 5);

        assert_eq!(registry.cancel_view(1), 2);
        assert!(rx1.await.is_err());
        assert!(rx3.await.is_err());
        // View 2's waiter survives.
        assert_eq!(registry.pending_count(&path()), 1);
    }

    #[tokio::test]
    async fn test_invalidate_resolves_as_invalidated() {
        let registry = SubscriptionRegistry::new();
        let rx = registry.register(1, &path(), 3);
        assert_eq!(registry.invalidate(&path()), 1);
        assert!(matches!(rx.await.unwrap(), PullOutcome::Invalidated));
        assert_eq!(registry.pending_count(&path()), 0);
    }

    #[tokio::test]
    async fn test_cancel_specific_pull() {
        let registry = SubscriptionRegistry::new();
        let rx = registry.register(1, &path(), 3);
        assert!(registry.cancel(1, &path()));
        assert!(!registry.cancel(1, &path()));
        assert!(rx.await.is_err());
    }
}
