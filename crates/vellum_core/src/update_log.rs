//! Per-document update history.
//!
//! The log buffers every accepted update since the document's baseline, so a
//! client at version `v` can be brought current by replaying `v+1..current`.
//! History is retained for the document's residency; the amount is small
//! relative to a writing session.

use crate::document::Version;
use crate::update::Update;

/// Rejection from [`UpdateLog::append`]: the pushed version is not exactly
/// `current + 1`. The store wraps this with the document path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMismatch {
    /// The only version the log would have accepted.
    pub expected: Version,
    /// The version the caller pushed.
    pub got: Version,
}

/// Ordered, gapless history of updates for one document.
#[derive(Debug, Clone)]
pub struct UpdateLog {
    baseline: Version,
    updates: Vec<Update>,
}

impl UpdateLog {
    /// Create an empty log; the document starts at `baseline`.
    pub fn new(baseline: Version) -> Self {
        Self {
            baseline,
            updates: Vec::new(),
        }
    }

    /// The version the document content currently corresponds to.
    pub fn current_version(&self) -> Version {
        self.baseline + self.updates.len() as Version
    }

    /// The version the document started at for this residency.
    pub fn baseline(&self) -> Version {
        self.baseline
    }

    /// Append an update. Strict, gapless ordering: rejected unless
    /// `update.version == current_version() + 1`, and the log is unchanged
    /// on rejection. No compare-and-swap retries happen here; the caller
    /// resolves conflicts by re-fetching.
    pub fn append(&mut self, update: Update) -> std::result::Result<(), VersionMismatch> {
        let expected = self.current_version() + 1;
        if update.version != expected {
            return Err(VersionMismatch {
                expected,
                got: update.version,
            });
        }
        self.updates.push(update);
        Ok(())
    }

    /// The ordered slice of updates with version `> from_version`.
    ///
    /// Empty when `from_version >= current_version()`. A `from_version`
    /// below the baseline returns the full history - that slice is only
    /// contiguous from the baseline, so callers serving clients must gate
    /// pre-baseline versions against [`baseline`](Self::baseline) first.
    pub fn since(&self, from_version: Version) -> Vec<Update> {
        let skip = from_version.saturating_sub(self.baseline) as usize;
        if skip >= self.updates.len() {
            return Vec::new();
        }
        self.updates[skip..].to_vec()
    }

    /// Number of retained updates.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// True when no updates have been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
