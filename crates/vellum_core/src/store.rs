//! Authoritative document store.
//!
//! The store is the sole mutable owner of document content; every other
//! component refers to documents by path and version only. A first fetch
//! for a path loads it through the file-access collaborator and seeds the
//! version baseline; concurrent fetches for the same unresident path share
//! a single load (single-flight).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Notify;

use crate::config::AuthorityConfig;
use crate::document::{DocumentSnapshot, DocumentType, Version};
use crate::error::{AuthorityError, Result};
use crate::fs::AsyncFileSystem;
use crate::update::Update;
use crate::update_log::UpdateLog;

/// A resident document: content, classification, history, saved snapshot.
struct Resident {
    content: String,
    doc_type: DocumentType,
    log: UpdateLog,
    /// Content at the last save; the dirty flag is derived by comparison.
    saved: String,
}

/// Path-keyed owner of all open documents.
pub struct DocumentStore<FS: AsyncFileSystem> {
    fs: FS,
    docs: RwLock<HashMap<PathBuf, Resident>>,
    /// In-flight loads, for single-flight fetch.
    loads: Mutex<HashMap<PathBuf, Arc<Notify>>>,
    /// Baselines for reopened paths: a closed document must never hand out
    /// a version a still-connected client already observed this session.
    reopen_floor: Mutex<HashMap<PathBuf, Version>>,
    config: AuthorityConfig,
}

impl<FS: AsyncFileSystem> DocumentStore<FS> {
    /// Create a store over the given file-access collaborator.
    pub fn new(fs: FS, config: AuthorityConfig) -> Self {
        Self {
            fs,
            docs: RwLock::new(HashMap::new()),
            loads: Mutex::new(HashMap::new()),
            reopen_floor: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Current authoritative snapshot, loading the document if unresident.
    ///
    /// The boolean is true when this call performed the load (the caller
    /// emits `file-opened` exactly once per residency). Suspends while the
    /// file is read; never blocks the event loop.
    pub async fn fetch(&self, path: &Path) -> Result<(DocumentSnapshot, bool)> {
        loop {
            if let Some(snapshot) = self.snapshot(path) {
                return Ok((snapshot, false));
            }

            // Join an in-flight load if one exists, else claim the load.
            let waiting = {
                let mut loads = self.loads.lock().unwrap();
                match loads.get(path) {
                    Some(notify) => Some(Arc::clone(notify)),
                    None => {
                        loads.insert(path.to_path_buf(), Arc::new(Notify::new()));
                        None
                    }
                }
            };

            match waiting {
                Some(notify) => {
                    // Register interest before re-checking, so a load that
                    // completes in between cannot strand this waiter.
                    let notified = notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();
                    if self.loads.lock().unwrap().contains_key(path) {
                        notified.await;
                    }
                    continue;
                }
                None => {
                    let loaded = self.load(path).await;
                    if let Some(notify) = self.loads.lock().unwrap().remove(path) {
                        notify.notify_waiters();
                    }
                    let snapshot = loaded?;
                    return Ok((snapshot, true));
                }
            }
        }
    }

    /// Perform the actual file read and make the document resident.
    async fn load(&self, path: &Path) -> Result<DocumentSnapshot> {
        let content =
            self.fs
                .read_to_string(path)
                .await
                .map_err(|source| AuthorityError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;

        let doc_type = DocumentType::from_path(path).unwrap_or(DocumentType::Markdown);
        let baseline = self
            .reopen_floor
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(self.config.version_baseline);

        log::debug!(
            "[Store] loaded '{}' ({:?}, {} bytes, baseline v{})",
            path.display(),
            doc_type,
            content.len(),
            baseline
        );

        let mut docs = self.docs.write().unwrap();
        docs.insert(
            path.to_path_buf(),
            Resident {
                saved: content.clone(),
                content,
                doc_type,
                log: UpdateLog::new(baseline),
            },
        );
        let resident = &docs[path];
        Ok(DocumentSnapshot {
            path: path.to_path_buf(),
            content: resident.content.clone(),
            doc_type: resident.doc_type,
            version: resident.log.current_version(),
        })
    }

    /// Snapshot of a resident document, or `None` if the path is not open.
    pub fn snapshot(&self, path: &Path) -> Option<DocumentSnapshot> {
        let docs = self.docs.read().unwrap();
        let resident = docs.get(path)?;
        Some(DocumentSnapshot {
            path: path.to_path_buf(),
            content: resident.content.clone(),
            doc_type: resident.doc_type,
            version: resident.log.current_version(),
        })
    }

    /// Current version of a resident document.
    pub fn current_version(&self, path: &Path) -> Option<Version> {
        let docs = self.docs.read().unwrap();
        docs.get(path).map(|r| r.log.current_version())
    }

    /// Baseline version of a resident document's current residency. A
    /// version below this predates the residency and cannot be caught up
    /// from the log.
    pub fn baseline(&self, path: &Path) -> Result<Version> {
        let docs = self.docs.read().unwrap();
        docs.get(path)
            .map(|r| r.log.baseline())
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))
    }

    /// True if the path is resident.
    pub fn contains(&self, path: &Path) -> bool {
        self.docs.read().unwrap().contains_key(path)
    }

    /// Accept a pushed update: strict gapless version check, apply, append.
    ///
    /// Pure in-memory state transition, no suspension point. Returns the new
    /// version and whether the document now differs from its saved snapshot.
    /// On any error the buffer and log are unchanged.
    pub fn append(&self, path: &Path, update: Update) -> Result<(Version, bool)> {
        let mut docs = self.docs.write().unwrap();
        let resident = docs
            .get_mut(path)
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))?;

        // Validate the content transition before touching the log, so a
        // malformed update cannot leave a version without content.
        let expected = resident.log.current_version() + 1;
        if update.version != expected {
            return Err(AuthorityError::VersionConflict {
                path: path.to_path_buf(),
                expected,
                got: update.version,
            });
        }
        let new_content = update.apply_to(&resident.content)?;
        resident
            .log
            .append(update)
            .map_err(|m| AuthorityError::VersionConflict {
                path: path.to_path_buf(),
                expected: m.expected,
                got: m.got,
            })?;
        resident.content = new_content;

        let version = resident.log.current_version();
        log::debug!("[Store] '{}' now at v{}", path.display(), version);
        Ok((version, resident.content != resident.saved))
    }

    /// Ordered updates with version `> from_version`.
    pub fn since(&self, path: &Path, from_version: Version) -> Result<Vec<Update>> {
        let docs = self.docs.read().unwrap();
        let resident = docs
            .get(path)
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))?;
        Ok(resident.log.since(from_version))
    }

    /// Whether the document differs from its last saved snapshot.
    pub fn is_dirty(&self, path: &Path) -> Result<bool> {
        let docs = self.docs.read().unwrap();
        let resident = docs
            .get(path)
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))?;
        Ok(resident.content != resident.saved)
    }

    /// Record that the external save pipeline persisted the current content.
    ///
    /// Returns true if the document was dirty before (the tracker and
    /// status badge need updating).
    pub fn mark_saved(&self, path: &Path) -> Result<bool> {
        let mut docs = self.docs.write().unwrap();
        let resident = docs
            .get_mut(path)
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))?;
        let was_dirty = resident.content != resident.saved;
        resident.saved = resident.content.clone();
        Ok(was_dirty)
    }

    /// Absorb a change made to the file outside this process.
    ///
    /// The new content becomes both buffer and saved snapshot, propagated as
    /// a regular whole-buffer update so pending pulls converge without a
    /// re-fetch. Returns `None` when the disk content matches the buffer
    /// (nothing to propagate).
    pub fn apply_remote_change(&self, path: &Path, new_content: &str) -> Result<Option<Update>> {
        let mut docs = self.docs.write().unwrap();
        let resident = docs
            .get_mut(path)
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))?;

        if resident.content == new_content {
            resident.saved = new_content.to_string();
            return Ok(None);
        }

        let version = resident.log.current_version() + 1;
        let update = Update::replace_all(version, resident.content.chars().count(), new_content);
        resident
            .log
            .append(update.clone())
            .map_err(|m| AuthorityError::VersionConflict {
                path: path.to_path_buf(),
                expected: m.expected,
                got: m.got,
            })?;
        resident.content = new_content.to_string();
        resident.saved = new_content.to_string();

        log::debug!(
            "[Store] '{}' replaced from disk, now at v{}",
            path.display(),
            version
        );
        Ok(Some(update))
    }

    /// Evict a document. Records a reopen floor so a later residency seeds
    /// strictly above every version handed out in this one.
    pub fn close(&self, path: &Path) -> Result<Version> {
        let mut docs = self.docs.write().unwrap();
        let resident = docs
            .remove(path)
            .ok_or_else(|| AuthorityError::NotFound(path.to_path_buf()))?;
        let last = resident.log.current_version();
        self.reopen_floor
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), last + 1);
        log::debug!("[Store] closed '{}' at v{}", path.display(), last);
        Ok(last)
    }

    /// Paths of all resident documents.
    pub fn open_paths(&self) -> Vec<PathBuf> {
        self.docs.read().unwrap().keys().cloned().collect()
    }
}
