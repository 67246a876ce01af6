//! Tracker service: the write paths over both stores.
//!
//! Every mutation here is file-first. The document is validated, written to
//! the tree through the tracker's [`WriteContext`], and only then reconciled
//! into the index inside a `mutate` transaction. Read paths for listing go
//! straight to the index.
//!
//! # Submodules
//!
//! - [`projects`] - Project create, update, archive cascade, destroy
//! - [`issues`] - Issue create, update, comment, show, purge
//! - [`lifecycle`] - Status transitions, recover, bulk variants
//! - [`boards`] - Board show (with auto-create) and update

pub mod boards;
pub mod issues;
pub mod lifecycle;
pub mod projects;

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{IssueDocument, Lifecycle};
use crate::storage::SqliteStorage;
use crate::sync::{DocumentStore, Reconciler, SelfWriteLedger, WriteContext};
use crate::validate::find_similar_ids;

pub use boards::{BoardView, ColumnView};
pub use issues::{IssueDetails, IssuePatch, NewIssue};
pub use projects::{NewProject, ProjectPatch, ProjectSummary};

/// Outcome of a bulk operation. One failure never stops the batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub tracking_id: String,
    pub error: String,
}

impl BulkResult {
    fn record<T>(&mut self, tracking_id: &str, result: Result<T>) {
        match result {
            Ok(_) => self.succeeded.push(tracking_id.to_string()),
            Err(e) => self.failed.push(BulkFailure {
                tracking_id: tracking_id.to_string(),
                error: e.to_string(),
            }),
        }
    }
}

/// Both stores plus the acting user.
pub struct Tracker {
    storage: SqliteStorage,
    store: DocumentStore,
    writes: WriteContext,
    actor: String,
}

impl Tracker {
    #[must_use]
    pub fn new(storage: SqliteStorage, store: DocumentStore, actor: impl Into<String>) -> Self {
        Self {
            storage,
            store,
            writes: WriteContext::detached(),
            actor: actor.into(),
        }
    }

    /// Open an initialized data root and its index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if the data root has not been set up
    /// by `sm init`, or an error if the index cannot be opened.
    pub fn open(data_dir: &Path, db_path: &Path, actor: impl Into<String>) -> Result<Self> {
        let store = DocumentStore::new(data_dir);
        if !store.layout().projects_dir().is_dir() || !db_path.exists() {
            return Err(Error::NotInitialized);
        }
        let storage = SqliteStorage::open(db_path)?;
        Ok(Self::new(storage, store, actor))
    }

    /// Mark every write in the shared ledger so a watcher in this process
    /// skips the echoes.
    #[must_use]
    pub fn with_ledger(mut self, ledger: &SelfWriteLedger) -> Self {
        self.writes = WriteContext::internal(ledger);
        self
    }

    #[must_use]
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        &mut self.storage
    }

    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Load an issue document from whichever lifecycle directory holds it.
    pub(crate) fn load_issue(&self, tracking_id: &str) -> Result<(IssueDocument, Lifecycle)> {
        match self.store.read_issue_any(tracking_id)? {
            Some(found) => Ok(found),
            None => Err(self.issue_not_found(tracking_id)),
        }
    }

    fn issue_not_found(&self, tracking_id: &str) -> Error {
        let known = self.storage.all_tracking_ids().unwrap_or_default();
        let similar = find_similar_ids(tracking_id, &known, 3);
        if similar.is_empty() {
            Error::IssueNotFound {
                id: tracking_id.to_string(),
            }
        } else {
            Error::IssueNotFoundSimilar {
                id: tracking_id.to_string(),
                similar,
            }
        }
    }

    /// Reconcile one issue document written at `lifecycle`.
    ///
    /// With `replace_links` the outgoing edges are rebuilt from the document;
    /// otherwise links are only added.
    pub(crate) fn sync_issue(
        &mut self,
        doc: &IssueDocument,
        lifecycle: Lifecycle,
        replace_links: bool,
        op: &str,
    ) -> Result<()> {
        let layout = self.store.layout();
        let actor = self.actor.clone();
        self.storage.mutate(op, &actor, |tx, _ctx| {
            let reconciler = Reconciler::new(tx, layout);
            reconciler.sync_issue(doc, lifecycle)?;
            if replace_links {
                reconciler.replace_links(doc)?;
            } else {
                reconciler.sync_links(doc)?;
            }
            Ok(())
        })?;
        debug!(id = %doc.tracking_id, op, "Indexed issue");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::tracker;
    use super::*;

    #[test]
    fn test_open_requires_init() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Tracker::open(&dir.path().join("data"), &dir.path().join("index.db"), "x")
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[test]
    fn test_not_found_suggests_similar_ids() {
        let mut t = test_support::tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("First")).unwrap();

        let err = t.load_issue("ENG-11").unwrap_err();
        match err {
            Error::IssueNotFoundSimilar { similar, .. } => assert_eq!(similar, vec!["ENG-1"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            tracker().load_issue("ENG-1").unwrap_err(),
            Error::IssueNotFound { .. }
        ));
    }

    #[test]
    fn test_ledger_suppresses_tracker_echoes() {
        use crate::model::{IssueStatus, Lifecycle};
        use crate::sync::{Applied, ChangeApplier, SelfWriteLedger};

        let ledger = SelfWriteLedger::default();
        let test_support::TestTracker { dir, tracker } = test_support::tracker_with_project();
        let mut tracker = tracker.with_ledger(&ledger);
        tracker.create_issue("ENG", NewIssue::titled("Echo")).unwrap();
        tracker.transition("ENG-1", IssueStatus::Archived).unwrap();

        let store = tracker.store().clone();
        let watcher_index = SqliteStorage::open(&dir.path().join("watch.db")).unwrap();
        let mut applier = ChangeApplier::new(watcher_index, store.clone(), ledger);

        let archived = store.layout().issue_file("ENG-1", Lifecycle::Archived);
        let active = store.layout().issue_file("ENG-1", Lifecycle::Active);
        assert_eq!(applier.apply(&archived).unwrap(), Applied::Suppressed);
        assert_eq!(applier.apply(&active).unwrap(), Applied::Suppressed);
        assert!(applier.storage().get_issue("ENG-1").unwrap().is_none());
    }

    #[test]
    fn test_watcher_in_another_process_skips_tracker_writes() {
        use crate::model::{IssueStatus, Lifecycle};
        use crate::sync::{Applied, ChangeApplier, SelfWriteLedger};

        let dir = tempfile::TempDir::new().unwrap();
        let data = dir.path().join("data");
        let db = dir.path().join("index.db");
        DocumentStore::new(&data).ensure_directories().unwrap();
        SqliteStorage::open(&db).unwrap();

        let mut tracker = Tracker::open(&data, &db, "ada@example.com").unwrap();
        tracker
            .create_project(NewProject {
                key: "ENG".into(),
                name: "Engineering".into(),
                ..NewProject::default()
            })
            .unwrap();
        tracker.create_issue("ENG", NewIssue::titled("Echo")).unwrap();
        tracker.transition("ENG-1", IssueStatus::Archived).unwrap();

        // Own connection and an empty ledger, as `sm watch` has
        let store = DocumentStore::new(&data);
        let mut applier =
            ChangeApplier::new(SqliteStorage::open(&db).unwrap(), store.clone(), SelfWriteLedger::default());
        let layout = store.layout();
        for path in [
            layout.project_file("ENG"),
            layout.board_file("ENG"),
            layout.issue_file("ENG-1", Lifecycle::Active),
            layout.issue_file("ENG-1", Lifecycle::Archived),
        ] {
            assert_eq!(applier.apply(&path).unwrap(), Applied::Suppressed, "{}", path.display());
        }

        // A hand edit afterwards is still picked up
        let archived = layout.issue_file("ENG-1", Lifecycle::Archived);
        let edited = std::fs::read_to_string(&archived)
            .unwrap()
            .replace("\"Echo\"", "\"Edited\"");
        std::fs::write(&archived, edited).unwrap();
        assert!(matches!(applier.apply(&archived).unwrap(), Applied::Synced(..)));
        assert_eq!(tracker.storage().get_issue("ENG-1").unwrap().unwrap().title, "Edited");
    }

    #[test]
    fn test_bulk_result_records_both_outcomes() {
        let mut result = BulkResult::default();
        result.record("ENG-1", Ok(()));
        result.record::<()>("ENG-2", Err(Error::IssueNotFound { id: "ENG-2".into() }));

        assert_eq!(result.succeeded, vec!["ENG-1"]);
        assert_eq!(result.failed[0].tracking_id, "ENG-2");
        assert_eq!(result.failed[0].error, "Issue not found: ENG-2");
    }
}
