//! Watch-sync: keeps the index following edits made directly to the tree.
//!
//! A `notify` watcher feeds raw events into a channel. A background thread
//! batches them for a debounce window, de-duplicates paths, and hands each
//! path to a [`ChangeApplier`]. Events that are echoes of writes already
//! indexed are dropped: a file whose content hash matches the hash recorded
//! when it was last synced is unchanged, whichever process wrote it, and a
//! removed path with no recorded hash was never indexed from there. Writes
//! from this process are also caught earlier through the shared
//! [`SelfWriteLedger`], before their sync has committed.
//! A failure on one path is logged and never stops the loop.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{BoardDocument, IssueDocument, Lifecycle, ProjectDocument};
use crate::storage::SqliteStorage;
use crate::sync::hash::file_hash;
use crate::sync::reconcile::Reconciler;
use crate::sync::store::{read_document, DocumentStore};
use crate::sync::suppress::SelfWriteLedger;
use crate::sync::types::DocumentKind;

const WATCH_ACTOR: &str = "watcher";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What applying one changed path did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Document parsed and upserted.
    Synced(DocumentKind, String),
    /// File gone, index row deleted.
    Removed(DocumentKind, String),
    /// Our own write; nothing done.
    Suppressed,
    /// Not a document, or a document that could not be parsed.
    Ignored,
}

/// Applies one changed path to the index.
pub struct ChangeApplier {
    storage: SqliteStorage,
    store: DocumentStore,
    ledger: SelfWriteLedger,
}

impl ChangeApplier {
    #[must_use]
    pub fn new(storage: SqliteStorage, store: DocumentStore, ledger: SelfWriteLedger) -> Self {
        Self {
            storage,
            store,
            ledger,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Classify `path` from its location and bring the index in line with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index update fails, for example when an issue
    /// names a project that is not indexed.
    pub fn apply(&mut self, path: &Path) -> Result<Applied> {
        let Some(location) = self.store.layout().classify(path) else {
            return Ok(Applied::Ignored);
        };
        if self.ledger.is_self_write(path) {
            debug!(path = %path.display(), "Skipping self-write");
            return Ok(Applied::Suppressed);
        }

        let layout = self.store.layout().clone();
        let indexed = self.storage.indexed_hash(&layout.relative(path))?;
        let current = if path.exists() { file_hash(path) } else { None };
        if current == indexed {
            debug!(path = %path.display(), "Skipping already indexed state");
            return Ok(Applied::Suppressed);
        }

        let key = location.key.clone();

        if path.exists() {
            return match location.kind {
                DocumentKind::Project => {
                    let Some(doc) = read_document::<ProjectDocument>(path)? else {
                        return Ok(Applied::Ignored);
                    };
                    self.storage.mutate("watch_sync_project", WATCH_ACTOR, |tx, _ctx| {
                        Reconciler::new(tx, &layout).sync_project(&doc)?;
                        Ok(())
                    })?;
                    Ok(Applied::Synced(DocumentKind::Project, doc.key))
                }
                DocumentKind::Board => {
                    let Some(doc) = read_document::<BoardDocument>(path)? else {
                        return Ok(Applied::Ignored);
                    };
                    self.storage.mutate("watch_sync_board", WATCH_ACTOR, |tx, _ctx| {
                        Reconciler::new(tx, &layout).sync_board(&doc)?;
                        Ok(())
                    })?;
                    Ok(Applied::Synced(DocumentKind::Board, doc.project))
                }
                DocumentKind::Issue => {
                    let Some(doc) = read_document::<IssueDocument>(path)? else {
                        return Ok(Applied::Ignored);
                    };
                    let origin = location.lifecycle.unwrap_or(doc.expected_lifecycle());
                    self.sync_issue(&doc, origin)?;
                    Ok(Applied::Synced(DocumentKind::Issue, doc.tracking_id))
                }
            };
        }

        match location.kind {
            DocumentKind::Project => {
                self.storage.mutate("watch_remove_project", WATCH_ACTOR, |tx, _ctx| {
                    Ok(Reconciler::new(tx, &layout).remove_project(&key)?)
                })?;
            }
            DocumentKind::Board => {
                self.storage.mutate("watch_remove_board", WATCH_ACTOR, |tx, _ctx| {
                    Ok(Reconciler::new(tx, &layout).remove_board(&key)?)
                })?;
            }
            DocumentKind::Issue => {
                // A move shows up as a removal; follow the document if it
                // still lives in another lifecycle directory.
                if let Some((doc, origin)) = self.store.read_issue_any(&key)? {
                    self.sync_issue(&doc, origin)?;
                    return Ok(Applied::Synced(DocumentKind::Issue, doc.tracking_id));
                }
                self.storage.mutate("watch_remove_issue", WATCH_ACTOR, |tx, _ctx| {
                    Ok(Reconciler::new(tx, &layout).remove_issue(&key)?)
                })?;
            }
        }
        Ok(Applied::Removed(location.kind, key))
    }

    fn sync_issue(&mut self, doc: &IssueDocument, origin: Lifecycle) -> Result<()> {
        let layout = self.store.layout();
        self.storage.mutate("watch_sync_issue", WATCH_ACTOR, |tx, _ctx| {
            let reconciler = Reconciler::new(tx, layout);
            reconciler.sync_issue(doc, origin)?;
            reconciler.replace_links(doc)?;
            Ok(())
        })
    }
}

/// Handle to a running watcher. Dropping it stops the background thread.
pub struct WatchHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
}

impl WatchHandle {
    /// Stop watching and wait for the background thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Block until the background thread exits.
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Dropping the watcher closes the channel feeding the thread
        self.watcher.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start watching the data root of `store`, applying changes to the index
/// at `db_path`.
///
/// The index connection is opened before the thread starts so a bad path
/// fails here rather than in the background.
///
/// # Errors
///
/// Returns an error if the index cannot be opened or the watcher cannot be
/// registered on the data root.
pub fn start(
    store: DocumentStore,
    db_path: &Path,
    ledger: SelfWriteLedger,
    debounce: Duration,
) -> Result<WatchHandle> {
    let storage = SqliteStorage::open(db_path)?;
    store.ensure_directories()?;
    let root = store.layout().root().to_path_buf();

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "Watching document tree");

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    let mut applier = ChangeApplier::new(storage, store, ledger);

    let thread = std::thread::Builder::new()
        .name("sm-watch".to_string())
        .spawn(move || run_loop(&rx, &mut applier, &stop_flag, debounce))?;

    Ok(WatchHandle {
        stop,
        thread: Some(thread),
        watcher: Some(watcher),
    })
}

fn run_loop(
    rx: &mpsc::Receiver<notify::Result<Event>>,
    applier: &mut ChangeApplier,
    stop: &AtomicBool,
    debounce: Duration,
) {
    while !stop.load(Ordering::SeqCst) {
        let first = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let mut pending = BTreeSet::new();
        collect_paths(first, &mut pending);

        let deadline = Instant::now() + debounce;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match rx.recv_timeout(remaining) {
                Ok(event) => collect_paths(event, &mut pending),
                Err(_) => break,
            }
        }

        for path in pending {
            match applier.apply(&path) {
                Ok(Applied::Synced(kind, key)) => info!(%kind, %key, "Synced external change"),
                Ok(Applied::Removed(kind, key)) => info!(%kind, %key, "Removed from index"),
                Ok(Applied::Suppressed | Applied::Ignored) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Watch sync failed"),
            }
        }
    }
    debug!("Watch loop stopped");
}

fn collect_paths(event: notify::Result<Event>, pending: &mut BTreeSet<PathBuf>) {
    match event {
        Ok(event) if event.kind.is_access() => {}
        Ok(event) => {
            pending.extend(
                event
                    .paths
                    .into_iter()
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json")),
            );
        }
        Err(e) => warn!(error = %e, "Watcher error"),
    }
}
