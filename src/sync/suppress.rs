//! Self-write suppression for the watcher.
//!
//! Every write or removal the tracker performs through a [`WriteContext`]
//! leaves a short-lived mark in a shared [`SelfWriteLedger`]. When the watcher
//! later sees an event for that path, it compares the file's current state
//! with the mark. A match means the event is our own echo and is dropped. A
//! mismatch means someone edited the file after us, so it is synced.
//!
//! Marks are keyed per path and carry content, so concurrent writers on
//! other threads never hide each other's external edits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::SELF_WRITE_TTL;
use crate::sync::hash::file_hash;

#[derive(Debug, Clone)]
struct Mark {
    /// Hash of the content we wrote, `None` for a removal.
    hash: Option<String>,
    expires: Instant,
}

/// Shared record of the tracker's own recent writes.
#[derive(Debug, Clone)]
pub struct SelfWriteLedger {
    marks: Arc<Mutex<HashMap<PathBuf, Mark>>>,
    ttl: Duration,
}

impl Default for SelfWriteLedger {
    fn default() -> Self {
        Self::new(SELF_WRITE_TTL)
    }
}

impl SelfWriteLedger {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            marks: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Note that we are about to write `hash` to `path`.
    pub fn record_write(&self, path: &Path, hash: String) {
        self.insert(path, Some(hash));
    }

    /// Note that we are about to remove `path`.
    pub fn record_removal(&self, path: &Path) {
        self.insert(path, None);
    }

    /// Whether the current state of `path` is exactly what we last left there.
    ///
    /// Expired marks are pruned on every call.
    #[must_use]
    pub fn is_self_write(&self, path: &Path) -> bool {
        let Ok(mut marks) = self.marks.lock() else {
            return false;
        };
        let now = Instant::now();
        marks.retain(|_, mark| mark.expires > now);

        let Some(mark) = marks.get(path) else {
            return false;
        };
        let current = if path.exists() { file_hash(path) } else { None };
        let matched = current == mark.hash;
        trace!(path = %path.display(), matched, "Checked self-write mark");
        matched
    }

    fn insert(&self, path: &Path, hash: Option<String>) {
        if let Ok(mut marks) = self.marks.lock() {
            marks.insert(
                path.to_path_buf(),
                Mark {
                    hash,
                    expires: Instant::now() + self.ttl,
                },
            );
        }
    }
}

/// Carried by every document write. Internal writers record marks in the
/// ledger; detached writers (tests, offline tools) record nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteContext {
    ledger: Option<SelfWriteLedger>,
}

impl WriteContext {
    /// Context whose writes are suppressed by a watcher sharing `ledger`.
    #[must_use]
    pub fn internal(ledger: &SelfWriteLedger) -> Self {
        Self {
            ledger: Some(ledger.clone()),
        }
    }

    /// Context whose writes are visible to any watcher.
    #[must_use]
    pub fn detached() -> Self {
        Self { ledger: None }
    }

    pub(crate) fn before_write(&self, path: &Path, hash: String) {
        if let Some(ledger) = &self.ledger {
            ledger.record_write(path, hash);
        }
    }

    pub(crate) fn before_remove(&self, path: &Path) {
        if let Some(ledger) = &self.ledger {
            ledger.record_removal(path);
        }
    }
}
