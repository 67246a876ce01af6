//! Reconciliation: projecting documents onto index rows.
//!
//! Every sync here is an upsert keyed by the document's natural key, so
//! applying the same document twice leaves the same rows. References by
//! email resolve to user ids or to NULL; references to projects must resolve.
//!
//! Each sync also records the content hash of the file it came from, so the
//! watcher can tell an unchanged file from an edit, even when the write was
//! made by another process.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{BoardDocument, IssueDocument, Lifecycle, ProjectDocument};
use crate::storage::sqlite::{
    delete_board_by_project_key, delete_issue_by_tracking_id, delete_outgoing_links,
    delete_project_by_key, forget_document_hashes, forget_project_issue_hashes,
    insert_comment_if_missing, insert_link_if_missing, issue_id_by_tracking_id, project_id_by_key,
    record_document_hash, upsert_board_row, upsert_issue_row, upsert_project_row,
    user_id_by_email, wipe_index, IssueRowRefs, SqliteStorage,
};
use crate::sync::hash::file_hash;
use crate::sync::layout::Layout;
use crate::sync::store::DocumentStore;
use crate::sync::types::{DocumentKind, RebuildStats, SyncError, SyncResult};

/// Applies documents to the index through a borrowed connection.
///
/// The connection may be a transaction; nothing here commits.
pub struct Reconciler<'a> {
    conn: &'a Connection,
    layout: &'a Layout,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection, layout: &'a Layout) -> Self {
        Self { conn, layout }
    }

    /// Upsert a project row. An unknown lead email becomes NULL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn sync_project(&self, doc: &ProjectDocument) -> SyncResult<i64> {
        let lead_id = self.resolve_user(doc.lead.as_deref())?;
        let id = upsert_project_row(self.conn, doc, lead_id)?;
        self.record_hash(DocumentKind::Project, &doc.key, &self.layout.project_file(&doc.key))?;
        debug!(key = %doc.key, "Synced project");
        Ok(id)
    }

    /// Upsert an issue row and its embedded comments. Links are left alone.
    ///
    /// `origin` is the lifecycle directory the document was read from; it
    /// decides the stored file path and which of the document's lifecycle
    /// timestamps apply:
    /// - active: both cleared
    /// - archived: `archived_at`, defaulting to `updated_at`; `deleted_at` cleared
    /// - deleted: `deleted_at`, defaulting to `updated_at`; `archived_at` as written
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingProject`] if the owning project is not indexed.
    pub fn sync_issue(&self, doc: &IssueDocument, origin: Lifecycle) -> SyncResult<i64> {
        let path = self.layout.issue_file(&doc.tracking_id, origin);
        let file_path = self.layout.relative(&path);

        let project_id =
            project_id_by_key(self.conn, &doc.project)?.ok_or_else(|| SyncError::MissingProject {
                document: file_path.clone(),
                project: doc.project.clone(),
            })?;

        let updated = doc.updated();
        let (archived_at, deleted_at) = match origin {
            Lifecycle::Active => (None, None),
            Lifecycle::Archived => (Some(doc.archived_at.unwrap_or(updated)), None),
            Lifecycle::Deleted => (doc.archived_at, Some(doc.deleted_at.unwrap_or(updated))),
        };

        let refs = IssueRowRefs {
            project_id,
            assignee_id: self.resolve_user(doc.assignee.as_deref())?,
            reporter_id: self.resolve_user(doc.reporter.as_deref())?,
            file_path: &file_path,
            archived_at: archived_at.map(|t| t.timestamp_millis()),
            deleted_at: deleted_at.map(|t| t.timestamp_millis()),
        };
        let issue_id = upsert_issue_row(self.conn, doc, &refs)?;
        // A move leaves the old path behind; only the origin is current
        forget_document_hashes(self.conn, DocumentKind::Issue.as_str(), &doc.tracking_id)?;
        self.record_hash(DocumentKind::Issue, &doc.tracking_id, &path)?;

        for comment in &doc.comments {
            let author_id = self.resolve_user(comment.author.as_deref())?;
            insert_comment_if_missing(
                self.conn,
                issue_id,
                author_id,
                &comment.body,
                comment.at.timestamp_millis(),
            )?;
        }

        debug!(id = %doc.tracking_id, %origin, "Synced issue");
        Ok(issue_id)
    }

    /// Insert the forward edges named by the document's links.
    ///
    /// Reverse types (`blocked_by`, `child`), unknown types and unresolved
    /// targets are skipped. An edge that already exists counts as satisfied.
    /// Returns the number of new edges.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or insert fails.
    pub fn sync_links(&self, doc: &IssueDocument) -> SyncResult<usize> {
        let Some(source_id) = issue_id_by_tracking_id(self.conn, &doc.tracking_id)? else {
            debug!(id = %doc.tracking_id, "Skipping links of unindexed issue");
            return Ok(0);
        };

        let created = doc.updated().timestamp_millis();
        let mut inserted = 0;
        for link in &doc.links {
            let Some(kind) = link.kind() else {
                warn!(id = %doc.tracking_id, link_type = %link.link_type, "Dropping link with unknown type");
                continue;
            };
            if !kind.is_forward() {
                continue;
            }
            let Some(target_id) = issue_id_by_tracking_id(self.conn, &link.target)? else {
                debug!(id = %doc.tracking_id, target = %link.target, "Link target not indexed");
                continue;
            };
            if insert_link_if_missing(self.conn, source_id, target_id, kind, created)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Drop the issue's outgoing edges, then sync its links afresh.
    ///
    /// # Errors
    ///
    /// Returns an error if a delete, lookup or insert fails.
    pub fn replace_links(&self, doc: &IssueDocument) -> SyncResult<usize> {
        if let Some(source_id) = issue_id_by_tracking_id(self.conn, &doc.tracking_id)? {
            delete_outgoing_links(self.conn, source_id)?;
        }
        self.sync_links(doc)
    }

    /// Upsert a board row, replacing its name and columns.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingProject`] if the project is not indexed.
    pub fn sync_board(&self, doc: &BoardDocument) -> SyncResult<i64> {
        let project_id =
            project_id_by_key(self.conn, &doc.project)?.ok_or_else(|| SyncError::MissingProject {
                document: self.layout.relative(&self.layout.board_file(&doc.project)),
                project: doc.project.clone(),
            })?;
        let id = upsert_board_row(self.conn, doc, project_id)?;
        self.record_hash(DocumentKind::Board, &doc.project, &self.layout.board_file(&doc.project))?;
        debug!(project = %doc.project, "Synced board");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_project(&self, key: &str) -> SyncResult<bool> {
        forget_project_issue_hashes(self.conn, key)?;
        forget_document_hashes(self.conn, DocumentKind::Board.as_str(), key)?;
        forget_document_hashes(self.conn, DocumentKind::Project.as_str(), key)?;
        delete_board_by_project_key(self.conn, key)?;
        Ok(delete_project_by_key(self.conn, key)?)
    }

    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_issue(&self, tracking_id: &str) -> SyncResult<bool> {
        forget_document_hashes(self.conn, DocumentKind::Issue.as_str(), tracking_id)?;
        Ok(delete_issue_by_tracking_id(self.conn, tracking_id)?)
    }

    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_board(&self, project_key: &str) -> SyncResult<bool> {
        forget_document_hashes(self.conn, DocumentKind::Board.as_str(), project_key)?;
        Ok(delete_board_by_project_key(self.conn, project_key)?)
    }

    /// Remember what the file at `path` held when it was indexed. A document
    /// synced without a file on disk leaves no hash.
    fn record_hash(&self, kind: DocumentKind, key: &str, path: &std::path::Path) -> SyncResult<()> {
        let hash = file_hash(path);
        record_document_hash(
            self.conn,
            &self.layout.relative(path),
            kind.as_str(),
            key,
            hash.as_deref(),
        )?;
        Ok(())
    }

    fn resolve_user(&self, email: Option<&str>) -> SyncResult<Option<i64>> {
        match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => Ok(user_id_by_email(self.conn, email)?),
            None => Ok(None),
        }
    }
}

/// Rebuild the whole index from the document tree.
///
/// Runs in one transaction: wipe, projects, every issue from all three
/// lifecycle directories, a second pass for links, then boards. Any failing
/// document aborts the rebuild and the previous index is kept.
///
/// # Errors
///
/// Returns [`Error::RebuildFailed`] naming the first document that could not
/// be applied.
pub fn full_rebuild(
    storage: &mut SqliteStorage,
    store: &DocumentStore,
    actor: &str,
) -> Result<RebuildStats> {
    let layout = store.layout();
    let failed = |path: &std::path::Path, e: SyncError| Error::RebuildFailed {
        document: layout.relative(path),
        reason: e.to_string(),
    };

    let stats = storage.mutate("full_rebuild", actor, |tx, _ctx| {
        wipe_index(tx)?;
        let reconciler = Reconciler::new(tx, layout);
        let mut stats = RebuildStats::default();

        for (path, doc) in store.list_projects()? {
            reconciler.sync_project(&doc).map_err(|e| failed(&path, e))?;
            stats.projects += 1;
        }

        let issues = store.list_all_issues()?;
        for (path, lifecycle, doc) in &issues {
            reconciler
                .sync_issue(doc, *lifecycle)
                .map_err(|e| failed(path, e))?;
            stats.issues += 1;
        }
        for (path, _, doc) in &issues {
            stats.links += reconciler.sync_links(doc).map_err(|e| failed(path, e))?;
        }

        for (path, doc) in store.list_boards()? {
            reconciler.sync_board(&doc).map_err(|e| failed(&path, e))?;
            stats.boards += 1;
        }

        let comments: i64 = tx.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        stats.comments = usize::try_from(comments).unwrap_or(0);
        Ok(stats)
    })?;

    info!(
        projects = stats.projects,
        issues = stats.issues,
        links = stats.links,
        boards = stats.boards,
        comments = stats.comments,
        "Rebuilt index"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommentEntry, IssueStatus, LinkEntry, LinkType};
    use crate::sync::suppress::WriteContext;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: DocumentStore,
        storage: SqliteStorage,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("data"));
        store.ensure_directories().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("index.db")).unwrap();
        Fixture { _dir: dir, store, storage }
    }

    fn issue(id: &str, status: IssueStatus) -> IssueDocument {
        let mut doc = IssueDocument::new(id.into(), "ENG".into(), format!("Issue {id}"));
        doc.status = status;
        doc
    }

    fn seed_tree(f: &Fixture) {
        let ctx = WriteContext::detached();
        f.store
            .write_project(&ProjectDocument::new("ENG".into(), "Engineering".into()), &ctx)
            .unwrap();
        f.store
            .write_board(&BoardDocument::with_defaults("ENG".into(), "Engineering Board".into()), &ctx)
            .unwrap();

        let mut one = issue("ENG-1", IssueStatus::Todo);
        one.links = vec![LinkEntry::new(LinkType::Blocks, "ENG-3")];
        one.comments = vec![CommentEntry {
            author: Some("ghost@example.com".into()),
            body: "first".into(),
            at: crate::model::now(),
        }];
        f.store.write_issue(&one, Lifecycle::Active, &ctx).unwrap();
        f.store
            .write_issue(&issue("ENG-2", IssueStatus::Archived), Lifecycle::Archived, &ctx)
            .unwrap();
        let mut three = issue("ENG-3", IssueStatus::Deleted);
        three.links = vec![
            LinkEntry::new(LinkType::BlockedBy, "ENG-1"),
            LinkEntry::new(LinkType::Parent, "ENG-2"),
        ];
        f.store.write_issue(&three, Lifecycle::Deleted, &ctx).unwrap();
    }

    fn snapshot(storage: &SqliteStorage) -> Vec<String> {
        let mut rows = Vec::new();
        let queries = [
            "SELECT key || '|' || name || '|' || status FROM projects ORDER BY key",
            "SELECT tracking_id || '|' || status || '|' || file_path || '|' ||
                    IFNULL(archived_at, '-') || '|' || IFNULL(deleted_at, '-') || '|' || updated_at
               FROM issues ORDER BY tracking_id",
            "SELECT s.tracking_id || '>' || l.link_type || '>' || t.tracking_id FROM issue_links l
               JOIN issues s ON s.id = l.source_issue_id JOIN issues t ON t.id = l.target_issue_id
              ORDER BY 1",
            "SELECT i.tracking_id || '|' || c.body || '|' || c.created_at FROM comments c
               JOIN issues i ON i.id = c.issue_id ORDER BY 1",
            "SELECT name || '|' || columns FROM boards ORDER BY name",
        ];
        for sql in queries {
            let mut stmt = storage.conn().prepare(sql).unwrap();
            let found: Vec<String> = stmt
                .query_map([], |row| row.get(0))
                .unwrap()
                .collect::<std::result::Result<_, _>>()
                .unwrap();
            rows.extend(found);
        }
        rows
    }

    #[test]
    fn test_rebuild_counts_every_lifecycle_directory() {
        let mut f = fixture();
        seed_tree(&f);

        let stats = full_rebuild(&mut f.storage, &f.store, "tester").unwrap();

        assert_eq!(
            stats,
            RebuildStats { projects: 1, issues: 3, links: 2, boards: 1, comments: 1 }
        );
        let expected: Vec<(String, String, String)> = vec![
                ("ENG-1".into(), "todo".into(), "issues/ENG-1.json".into()),
                ("ENG-2".into(), "archived".into(), "archive/issues/ENG-2.json".into()),
                ("ENG-3".into(), "deleted".into(), "deleted/issues/ENG-3.json".into()),
            ];
        assert_eq!(f.storage.issue_locations().unwrap(), expected);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut f = fixture();
        seed_tree(&f);

        full_rebuild(&mut f.storage, &f.store, "tester").unwrap();
        let first = snapshot(&f.storage);
        full_rebuild(&mut f.storage, &f.store, "tester").unwrap();
        let second = snapshot(&f.storage);

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_rebuild_ignores_prior_index_contents() {
        let mut f = fixture();
        seed_tree(&f);
        full_rebuild(&mut f.storage, &f.store, "tester").unwrap();
        let expected = snapshot(&f.storage);

        f.storage
            .conn()
            .execute_batch("DELETE FROM issue_links; UPDATE issues SET status = 'done';")
            .unwrap();
        full_rebuild(&mut f.storage, &f.store, "tester").unwrap();

        assert_eq!(snapshot(&f.storage), expected);
    }

    #[test]
    fn test_orphan_issue_aborts_rebuild_and_keeps_index() {
        let mut f = fixture();
        seed_tree(&f);
        full_rebuild(&mut f.storage, &f.store, "tester").unwrap();
        let before = snapshot(&f.storage);

        let mut orphan = IssueDocument::new("OPS-1".into(), "OPS".into(), "orphan".into());
        orphan.status = IssueStatus::Backlog;
        f.store
            .write_issue(&orphan, Lifecycle::Active, &WriteContext::detached())
            .unwrap();

        let err = full_rebuild(&mut f.storage, &f.store, "tester").unwrap_err();
        match err {
            Error::RebuildFailed { document, reason } => {
                assert_eq!(document, "issues/OPS-1.json");
                assert!(reason.contains("OPS"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(snapshot(&f.storage), before);
    }

    #[test]
    fn test_sync_issue_lifecycle_stamps() {
        let f = fixture();
        let reconciler = Reconciler::new(f.storage.conn(), f.store.layout());
        reconciler
            .sync_project(&ProjectDocument::new("ENG".into(), "Engineering".into()))
            .unwrap();

        // A hand-written archived document without a stamp falls back to updated_at
        let mut doc = issue("ENG-1", IssueStatus::Archived);
        reconciler.sync_issue(&doc, Lifecycle::Archived).unwrap();
        let archived = f.storage.get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(archived.archived_at, Some(doc.updated().timestamp_millis()));
        assert_eq!(archived.deleted_at, None);

        // Deleting keeps the archive stamp the document carries
        let stamped = doc.updated();
        doc.archived_at = Some(stamped);
        doc.set_status(IssueStatus::Deleted, stamped + chrono::Duration::seconds(5));
        reconciler.sync_issue(&doc, Lifecycle::Deleted).unwrap();
        let deleted = f.storage.get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(deleted.archived_at, Some(stamped.timestamp_millis()));
        assert_eq!(deleted.deleted_at, Some(doc.updated().timestamp_millis()));
        assert_eq!(deleted.file_path, "deleted/issues/ENG-1.json");

        doc.set_status(IssueStatus::Backlog, doc.updated());
        reconciler.sync_issue(&doc, Lifecycle::Active).unwrap();
        let active = f.storage.get_issue("ENG-1").unwrap().unwrap();
        assert_eq!((active.archived_at, active.deleted_at), (None, None));
    }

    #[test]
    fn test_rebuild_tolerates_null_fields() {
        let mut f = fixture();
        let ctx = WriteContext::detached();
        f.store
            .write_project(&ProjectDocument::new("ENG".into(), "Engineering".into()), &ctx)
            .unwrap();
        let issues = f.store.layout().issues_dir(Lifecycle::Active);
        let documents = [
            ("ENG-1", r#"{"tracking_id":"ENG-1","project":"ENG","title":"a","labels":null}"#),
            ("ENG-2", r#"{"tracking_id":"ENG-2","project":"ENG","title":"b","status":null,"links":null}"#),
            ("ENG-3", r#"{"tracking_id":"ENG-3","project":"ENG","title":"c","due_date":"","comments":null}"#),
        ];
        for (id, json) in documents {
            std::fs::write(issues.join(format!("{id}.json")), json).unwrap();
        }
        std::fs::write(
            f.store.layout().board_file("ENG"),
            r#"{"project":"ENG","name":"Board","columns":null}"#,
        )
        .unwrap();

        let stats = full_rebuild(&mut f.storage, &f.store, "tester").unwrap();

        assert_eq!(stats.issues, 3);
        assert_eq!(stats.boards, 1);
        let two = f.storage.get_issue("ENG-2").unwrap().unwrap();
        assert_eq!(two.status, "backlog");
        assert!(f.storage.get_issue("ENG-3").unwrap().unwrap().due_date.is_none());
    }

    #[test]
    fn test_sync_records_file_hashes() {
        let mut f = fixture();
        seed_tree(&f);
        full_rebuild(&mut f.storage, &f.store, "tester").unwrap();

        let layout = f.store.layout();
        let archived = layout.issue_file("ENG-2", Lifecycle::Archived);
        assert_eq!(
            f.storage.indexed_hash("archive/issues/ENG-2.json").unwrap(),
            crate::sync::file_hash(&archived)
        );
        assert!(f.storage.indexed_hash("projects/ENG.json").unwrap().is_some());
        assert!(f.storage.indexed_hash("boards/ENG-board.json").unwrap().is_some());

        // Syncing from another directory forgets the old path
        let mut doc = f.store.read_issue("ENG-2", Lifecycle::Archived).unwrap().unwrap();
        doc.set_status(IssueStatus::Todo, crate::model::now());
        f.store
            .move_issue(&doc, Lifecycle::Archived, Lifecycle::Active, &WriteContext::detached())
            .unwrap();
        Reconciler::new(f.storage.conn(), layout)
            .sync_issue(&doc, Lifecycle::Active)
            .unwrap();
        assert!(f.storage.indexed_hash("archive/issues/ENG-2.json").unwrap().is_none());
        assert!(f.storage.indexed_hash("issues/ENG-2.json").unwrap().is_some());
    }

    #[test]
    fn test_sync_issue_is_idempotent_for_comments() {
        let f = fixture();
        let reconciler = Reconciler::new(f.storage.conn(), f.store.layout());
        reconciler
            .sync_project(&ProjectDocument::new("ENG".into(), "Engineering".into()))
            .unwrap();
        let mut doc = issue("ENG-1", IssueStatus::Backlog);
        doc.comments.push(CommentEntry {
            author: None,
            body: "hello".into(),
            at: crate::model::now(),
        });

        let first = reconciler.sync_issue(&doc, Lifecycle::Active).unwrap();
        let second = reconciler.sync_issue(&doc, Lifecycle::Active).unwrap();

        assert_eq!(first, second);
        assert_eq!(f.storage.get_comments("ENG-1").unwrap().len(), 1);
    }

    #[test]
    fn test_sync_links_skips_reverse_unknown_and_unresolved() {
        let f = fixture();
        let reconciler = Reconciler::new(f.storage.conn(), f.store.layout());
        reconciler
            .sync_project(&ProjectDocument::new("ENG".into(), "Engineering".into()))
            .unwrap();
        reconciler.sync_issue(&issue("ENG-1", IssueStatus::Backlog), Lifecycle::Active).unwrap();

        let mut doc = issue("ENG-2", IssueStatus::Backlog);
        doc.links = vec![
            LinkEntry::new(LinkType::Blocks, "ENG-1"),
            LinkEntry::new(LinkType::Child, "ENG-1"),
            LinkEntry::new(LinkType::RelatesTo, "ENG-404"),
            LinkEntry { link_type: "mentions".into(), target: "ENG-1".into() },
            LinkEntry::new(LinkType::Blocks, "ENG-1"),
        ];
        reconciler.sync_issue(&doc, Lifecycle::Active).unwrap();

        assert_eq!(reconciler.sync_links(&doc).unwrap(), 1);
        assert_eq!(reconciler.sync_links(&doc).unwrap(), 0);
        assert_eq!(f.storage.index_counts().unwrap().links, 1);
    }

    #[test]
    fn test_replace_links_prunes_removed_entries() {
        let f = fixture();
        let reconciler = Reconciler::new(f.storage.conn(), f.store.layout());
        reconciler
            .sync_project(&ProjectDocument::new("ENG".into(), "Engineering".into()))
            .unwrap();
        for id in ["ENG-1", "ENG-2"] {
            reconciler.sync_issue(&issue(id, IssueStatus::Backlog), Lifecycle::Active).unwrap();
        }
        let mut doc = issue("ENG-3", IssueStatus::Backlog);
        doc.links = vec![
            LinkEntry::new(LinkType::Blocks, "ENG-1"),
            LinkEntry::new(LinkType::Parent, "ENG-2"),
        ];
        reconciler.sync_issue(&doc, Lifecycle::Active).unwrap();
        reconciler.sync_links(&doc).unwrap();

        doc.links = vec![LinkEntry::new(LinkType::Parent, "ENG-2")];
        reconciler.replace_links(&doc).unwrap();

        assert_eq!(
            f.storage.get_issue_links("ENG-3").unwrap(),
            vec![LinkEntry::new(LinkType::Parent, "ENG-2")]
        );
    }

    #[test]
    fn test_unknown_lead_resolves_to_null() {
        let mut f = fixture();
        f.storage.add_user("lead@example.com", Some("Lee"), None).unwrap();
        let reconciler = Reconciler::new(f.storage.conn(), f.store.layout());

        let mut project = ProjectDocument::new("ENG".into(), "Engineering".into());
        project.lead = Some("nobody@example.com".into());
        reconciler.sync_project(&project).unwrap();
        assert_eq!(f.storage.get_project("ENG").unwrap().unwrap().lead, None);

        project.lead = Some("lead@example.com".into());
        reconciler.sync_project(&project).unwrap();
        assert_eq!(
            f.storage.get_project("ENG").unwrap().unwrap().lead.as_deref(),
            Some("lead@example.com")
        );
    }

    #[test]
    fn test_board_for_unknown_project_fails() {
        let f = fixture();
        let reconciler = Reconciler::new(f.storage.conn(), f.store.layout());
        let board = BoardDocument::with_defaults("OPS".into(), "Ops Board".into());

        let err = reconciler.sync_board(&board).unwrap_err();
        assert!(matches!(err, SyncError::MissingProject { .. }));
    }
}
