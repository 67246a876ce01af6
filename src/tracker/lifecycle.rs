//! Status transitions.
//!
//! The status decides the directory: archived and deleted issues have their
//! own, everything else lives under `issues/`. A transition therefore moves
//! the document when the lifecycle changes, reindexes it from its new
//! location, and appends one transition row in the same index transaction.
//!
//! Nothing is locked between the file move and the index update. A crash in
//! between leaves a stale row for `sm repair` to fix.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{now, IssueDocument, IssueStatus, Lifecycle};
use crate::sync::Reconciler;
use crate::tracker::{BulkResult, Tracker};

impl Tracker {
    /// Move an issue to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the issue is deleted or already
    /// in `status`, or a not-found error for an unknown id.
    pub fn transition(&mut self, tracking_id: &str, status: IssueStatus) -> Result<IssueDocument> {
        let (mut doc, from_lifecycle) = self.load_issue(tracking_id)?;
        let from = doc.status;

        if from == IssueStatus::Deleted {
            return Err(Error::InvalidTransition {
                id: doc.tracking_id,
                reason: "Cannot transition a deleted issue; use recover instead".into(),
            });
        }
        if from == status {
            return Err(Error::InvalidTransition {
                id: doc.tracking_id,
                reason: format!("Issue is already in {status}"),
            });
        }

        let at = now();
        doc.set_status(status, at);
        let to_lifecycle = self.relocate(&doc, from_lifecycle)?;
        self.commit_transition(&doc, to_lifecycle, from, at, "transition")?;

        info!(id = %doc.tracking_id, %from, to = %status, "Transitioned issue");
        Ok(doc)
    }

    /// Bring a deleted issue back to the backlog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the issue is deleted.
    pub fn recover(&mut self, tracking_id: &str) -> Result<IssueDocument> {
        let (mut doc, from_lifecycle) = self.load_issue(tracking_id)?;
        if doc.status != IssueStatus::Deleted {
            return Err(Error::InvalidTransition {
                id: doc.tracking_id,
                reason: format!("Only deleted issues can be recovered; status is {}", doc.status),
            });
        }

        let at = now();
        doc.set_status(IssueStatus::Backlog, at);
        let to_lifecycle = self.relocate(&doc, from_lifecycle)?;
        self.commit_transition(&doc, to_lifecycle, IssueStatus::Deleted, at, "recover")?;

        info!(id = %doc.tracking_id, "Recovered issue");
        Ok(doc)
    }

    /// Apply [`Tracker::transition`] to each id independently.
    pub fn bulk_transition(&mut self, tracking_ids: &[String], status: IssueStatus) -> BulkResult {
        let mut result = BulkResult::default();
        for id in tracking_ids {
            let outcome = self.transition(id, status);
            result.record(id, outcome);
        }
        result
    }

    /// Apply [`Tracker::recover`] to each id independently.
    pub fn bulk_recover(&mut self, tracking_ids: &[String]) -> BulkResult {
        let mut result = BulkResult::default();
        for id in tracking_ids {
            let outcome = self.recover(id);
            result.record(id, outcome);
        }
        result
    }

    /// Write the document where its status says it belongs, removing it from
    /// `from` if that differs. Returns the new lifecycle.
    fn relocate(&self, doc: &IssueDocument, from: Lifecycle) -> Result<Lifecycle> {
        let to = doc.expected_lifecycle();
        if to == from {
            self.store.write_issue(doc, to, &self.writes)?;
        } else {
            self.store.move_issue(doc, from, to, &self.writes)?;
            info!(id = %doc.tracking_id, %from, %to, "Moved issue document");
        }
        Ok(to)
    }

    fn commit_transition(
        &mut self,
        doc: &IssueDocument,
        lifecycle: Lifecycle,
        from: IssueStatus,
        at: DateTime<Utc>,
        op: &str,
    ) -> Result<()> {
        let layout = self.store.layout();
        let actor = self.actor.clone();
        self.storage.mutate(op, &actor, |tx, ctx| {
            let reconciler = Reconciler::new(tx, layout);
            reconciler.sync_issue(doc, lifecycle)?;
            reconciler.sync_links(doc)?;
            ctx.record_transition(&doc.tracking_id, from, doc.status, at);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkType;
    use crate::storage::get_transitions;
    use crate::sync::{check_consistency, full_rebuild};
    use crate::tracker::test_support::{tracker_with_project, TestTracker};
    use crate::tracker::NewIssue;

    fn with_issue() -> TestTracker {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("First")).unwrap();
        t
    }

    fn statuses(t: &TestTracker, id: &str) -> Vec<(String, String)> {
        get_transitions(t.storage().conn(), id)
            .unwrap()
            .into_iter()
            .map(|tr| (tr.from_status, tr.to_status))
            .collect()
    }

    fn pair(from: &str, to: &str) -> (String, String) {
        (from.to_string(), to.to_string())
    }

    #[test]
    fn test_archive_moves_document() {
        let mut t = with_issue();
        let doc = t.transition("ENG-1", IssueStatus::Archived).unwrap();

        assert_eq!(doc.status, IssueStatus::Archived);
        let layout = t.store().layout();
        assert!(layout.root().join("archive/issues/ENG-1.json").exists());
        assert!(!layout.root().join("issues/ENG-1.json").exists());

        let row = t.storage().get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(row.status, "archived");
        assert_eq!(row.file_path, "archive/issues/ENG-1.json");
        assert!(row.archived_at.is_some());
        assert!(row.deleted_at.is_none());
        assert_eq!(statuses(&t, "ENG-1"), vec![pair("backlog", "archived")]);
        assert_eq!(
            get_transitions(t.storage().conn(), "ENG-1").unwrap()[0].actor.as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn test_delete_then_recover() {
        let mut t = with_issue();
        t.transition("ENG-1", IssueStatus::Archived).unwrap();
        t.transition("ENG-1", IssueStatus::Deleted).unwrap();

        let layout = t.store().layout().clone();
        assert!(layout.root().join("deleted/issues/ENG-1.json").exists());
        let row = t.storage().get_issue("ENG-1").unwrap().unwrap();
        assert!(row.deleted_at.is_some());
        assert!(row.archived_at.is_some());

        let doc = t.recover("ENG-1").unwrap();
        assert_eq!(doc.status, IssueStatus::Backlog);
        assert!(layout.root().join("issues/ENG-1.json").exists());
        assert!(!layout.root().join("deleted/issues/ENG-1.json").exists());
        let row = t.storage().get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(row.status, "backlog");
        assert!(row.archived_at.is_none());
        assert!(row.deleted_at.is_none());
        assert_eq!(
            statuses(&t, "ENG-1"),
            vec![
                pair("backlog", "archived"),
                pair("archived", "deleted"),
                pair("deleted", "backlog"),
            ]
        );
    }

    #[test]
    fn test_unarchive_to_normal_status() {
        let mut t = with_issue();
        t.transition("ENG-1", IssueStatus::Archived).unwrap();
        t.transition("ENG-1", IssueStatus::Todo).unwrap();

        assert_eq!(t.store().issue_locations("ENG-1"), vec![Lifecycle::Active]);
        let row = t.storage().get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(row.status, "todo");
        assert!(row.archived_at.is_none());
    }

    #[test]
    fn test_normal_transition_rewrites_in_place() {
        let mut t = with_issue();
        t.transition("ENG-1", IssueStatus::InProgress).unwrap();

        let doc = t.store().read_issue("ENG-1", Lifecycle::Active).unwrap().unwrap();
        assert_eq!(doc.status, IssueStatus::InProgress);
        assert_eq!(statuses(&t, "ENG-1"), vec![pair("backlog", "in_progress")]);
    }

    #[test]
    fn test_rejected_transitions_leave_no_trace() {
        let mut t = with_issue();
        let same = t.transition("ENG-1", IssueStatus::Backlog).unwrap_err();
        assert!(matches!(same, Error::InvalidTransition { .. }));
        assert!(same.to_string().contains("already in backlog"));

        let not_deleted = t.recover("ENG-1").unwrap_err();
        assert!(matches!(not_deleted, Error::InvalidTransition { .. }));

        t.transition("ENG-1", IssueStatus::Deleted).unwrap();
        let out_of_deleted = t.transition("ENG-1", IssueStatus::Todo).unwrap_err();
        assert!(out_of_deleted.hint().is_some());

        assert_eq!(statuses(&t, "ENG-1"), vec![pair("backlog", "deleted")]);
        assert_eq!(t.store().issue_locations("ENG-1"), vec![Lifecycle::Deleted]);
    }

    #[test]
    fn test_exactly_one_location_after_any_sequence() {
        let mut t = with_issue();
        let steps = [
            IssueStatus::Todo,
            IssueStatus::Archived,
            IssueStatus::InReview,
            IssueStatus::Archived,
            IssueStatus::Deleted,
        ];
        for status in steps {
            t.transition("ENG-1", status).unwrap();
            let places = t.store().issue_locations("ENG-1");
            assert_eq!(places, vec![status.lifecycle()], "after {status}");
        }
        t.recover("ENG-1").unwrap();
        assert_eq!(t.store().issue_locations("ENG-1"), vec![Lifecycle::Active]);
        assert!(check_consistency(t.storage(), t.store()).unwrap().is_clean());
    }

    #[test]
    fn test_bulk_collects_failures() {
        let mut t = with_issue();
        t.create_issue("ENG", NewIssue::titled("Second")).unwrap();
        t.transition("ENG-2", IssueStatus::Archived).unwrap();

        let ids = vec!["ENG-1".to_string(), "ENG-2".to_string(), "ENG-9".to_string()];
        let result = t.bulk_transition(&ids, IssueStatus::Archived);

        assert_eq!(result.succeeded, vec!["ENG-1"]);
        let failed: Vec<_> = result.failed.iter().map(|f| f.tracking_id.as_str()).collect();
        assert_eq!(failed, vec!["ENG-2", "ENG-9"]);

        let result = t.bulk_transition(&ids[..2], IssueStatus::Deleted);
        assert_eq!(result.succeeded.len(), 2);
        let result = t.bulk_recover(&ids);
        assert_eq!(result.succeeded, vec!["ENG-1", "ENG-2"]);
        assert_eq!(result.failed.len(), 1);
    }

    #[test]
    fn test_rebuild_after_transitions_reproduces_rows() {
        let mut t = with_issue();
        t.create_issue(
            "ENG",
            NewIssue {
                links: vec![crate::model::LinkEntry::new(LinkType::Blocks, "ENG-1")],
                ..NewIssue::titled("Second")
            },
        )
        .unwrap();
        t.create_issue("ENG", NewIssue::titled("Third")).unwrap();
        t.transition("ENG-1", IssueStatus::Archived).unwrap();
        t.transition("ENG-3", IssueStatus::Archived).unwrap();
        t.transition("ENG-3", IssueStatus::Deleted).unwrap();

        let before: Vec<_> = ["ENG-1", "ENG-2", "ENG-3"]
            .iter()
            .map(|id| {
                let row = t.storage().get_issue(id).unwrap().unwrap();
                (row.status, row.file_path, row.archived_at, row.deleted_at)
            })
            .collect();
        assert!(before[0].2.is_some() && before[0].3.is_none());
        assert!(before[1].2.is_none() && before[1].3.is_none());
        // Deleted from the archive keeps when it was archived
        assert!(before[2].2.is_some() && before[2].3.is_some());

        let actor = t.actor().to_string();
        let store = crate::sync::DocumentStore::new(t.store().layout().root());
        let stats = full_rebuild(t.storage_mut(), &store, &actor).unwrap();
        assert_eq!(stats.issues, 3);
        assert_eq!(stats.links, 1);

        let after: Vec<_> = ["ENG-1", "ENG-2", "ENG-3"]
            .iter()
            .map(|id| {
                let row = t.storage().get_issue(id).unwrap().unwrap();
                (row.status, row.file_path, row.archived_at, row.deleted_at)
            })
            .collect();
        assert_eq!(before, after);
    }
}
