//! Document store: the canonical JSON tree.
//!
//! Every document is a whole-file JSON value named after its natural key.
//! Writes replace the file atomically and leave a self-write mark through the
//! caller's [`WriteContext`]. Reads treat malformed JSON as absent and log it.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::{BoardDocument, IssueDocument, Lifecycle, ProjectDocument};
use crate::sync::file::{atomic_write, render_json};
use crate::sync::hash::content_hash;
use crate::sync::layout::Layout;
use crate::sync::suppress::WriteContext;
use crate::sync::types::SyncResult;

/// File-backed store over a data root.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    layout: Layout,
}

impl DocumentStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::new(root),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Create every directory of the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_directories(&self) -> SyncResult<()> {
        for dir in self.layout.all_dirs() {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    // ==================
    // Projects
    // ==================

    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub fn write_project(&self, doc: &ProjectDocument, ctx: &WriteContext) -> SyncResult<PathBuf> {
        let path = self.layout.project_file(&doc.key);
        write_document(&path, doc, ctx)?;
        Ok(path)
    }

    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn read_project(&self, key: &str) -> SyncResult<Option<ProjectDocument>> {
        read_document(&self.layout.project_file(key))
    }

    /// Remove a project document. Absent files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete_project(&self, key: &str, ctx: &WriteContext) -> SyncResult<bool> {
        remove_document(&self.layout.project_file(key), ctx)
    }

    /// Parsed project documents, sorted by filename.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list_projects(
        &self,
    ) -> SyncResult<impl Iterator<Item = (PathBuf, ProjectDocument)> + use<>> {
        list_documents(&self.layout.projects_dir())
    }

    // ==================
    // Issues
    // ==================

    /// Write an issue into the given lifecycle directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub fn write_issue(
        &self,
        doc: &IssueDocument,
        lifecycle: Lifecycle,
        ctx: &WriteContext,
    ) -> SyncResult<PathBuf> {
        let path = self.layout.issue_file(&doc.tracking_id, lifecycle);
        write_document(&path, doc, ctx)?;
        Ok(path)
    }

    /// Read an issue from one lifecycle directory.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn read_issue(
        &self,
        tracking_id: &str,
        lifecycle: Lifecycle,
    ) -> SyncResult<Option<IssueDocument>> {
        read_document(&self.layout.issue_file(tracking_id, lifecycle))
    }

    /// Read an issue wherever it lives, probing active, archived, then deleted.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn read_issue_any(&self, tracking_id: &str) -> SyncResult<Option<(IssueDocument, Lifecycle)>> {
        for lifecycle in Lifecycle::ALL {
            if let Some(doc) = self.read_issue(tracking_id, lifecycle)? {
                return Ok(Some((doc, lifecycle)));
            }
        }
        Ok(None)
    }

    /// First lifecycle directory holding a file for this issue, parsed or not.
    #[must_use]
    pub fn locate_issue(&self, tracking_id: &str) -> Option<Lifecycle> {
        Lifecycle::ALL
            .into_iter()
            .find(|lc| self.layout.issue_file(tracking_id, *lc).is_file())
    }

    /// Every lifecycle directory holding a file for this issue.
    #[must_use]
    pub fn issue_locations(&self, tracking_id: &str) -> Vec<Lifecycle> {
        Lifecycle::ALL
            .into_iter()
            .filter(|lc| self.layout.issue_file(tracking_id, *lc).is_file())
            .collect()
    }

    /// Whether any lifecycle directory holds a readable document for this issue.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn issue_exists(&self, tracking_id: &str) -> SyncResult<bool> {
        Ok(self.read_issue_any(tracking_id)?.is_some())
    }

    /// Remove an issue from one lifecycle directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete_issue(
        &self,
        tracking_id: &str,
        lifecycle: Lifecycle,
        ctx: &WriteContext,
    ) -> SyncResult<bool> {
        remove_document(&self.layout.issue_file(tracking_id, lifecycle), ctx)
    }

    /// Remove an issue from every lifecycle directory. Returns how many files went.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be removed.
    pub fn delete_issue_any(&self, tracking_id: &str, ctx: &WriteContext) -> SyncResult<usize> {
        let mut removed = 0;
        for lifecycle in Lifecycle::ALL {
            if self.delete_issue(tracking_id, lifecycle, ctx)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Move an issue between lifecycle directories, writing `doc` as the new
    /// content. The destination is written before the source is removed, so a
    /// failure in between leaves a duplicate rather than losing the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or the removal fails.
    pub fn move_issue(
        &self,
        doc: &IssueDocument,
        from: Lifecycle,
        to: Lifecycle,
        ctx: &WriteContext,
    ) -> SyncResult<PathBuf> {
        let path = self.write_issue(doc, to, ctx)?;
        if from != to {
            self.delete_issue(&doc.tracking_id, from, ctx)?;
            info!(id = %doc.tracking_id, %from, %to, "Moved issue document");
        }
        Ok(path)
    }

    /// Parsed issues of one lifecycle directory, sorted by filename.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list_issues(
        &self,
        lifecycle: Lifecycle,
    ) -> SyncResult<impl Iterator<Item = (PathBuf, IssueDocument)> + use<>> {
        list_documents(&self.layout.issues_dir(lifecycle))
    }

    /// Parsed issues of every lifecycle directory, tagged with their origin.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed.
    pub fn list_all_issues(&self) -> SyncResult<Vec<(PathBuf, Lifecycle, IssueDocument)>> {
        let mut all = Vec::new();
        for lifecycle in Lifecycle::ALL {
            all.extend(
                self.list_issues(lifecycle)?
                    .map(|(path, doc)| (path, lifecycle, doc)),
            );
        }
        Ok(all)
    }

    /// Filenames (without extension) of one issue directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn issue_stems(&self, lifecycle: Lifecycle) -> SyncResult<Vec<String>> {
        Ok(json_files(&self.layout.issues_dir(lifecycle))?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect())
    }

    // ==================
    // Boards
    // ==================

    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized or written.
    pub fn write_board(&self, doc: &BoardDocument, ctx: &WriteContext) -> SyncResult<PathBuf> {
        let path = self.layout.board_file(&doc.project);
        write_document(&path, doc, ctx)?;
        Ok(path)
    }

    /// # Errors
    ///
    /// Returns an error only for I/O failures other than "not found".
    pub fn read_board(&self, project_key: &str) -> SyncResult<Option<BoardDocument>> {
        read_document(&self.layout.board_file(project_key))
    }

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete_board(&self, project_key: &str, ctx: &WriteContext) -> SyncResult<bool> {
        remove_document(&self.layout.board_file(project_key), ctx)
    }

    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list_boards(&self) -> SyncResult<impl Iterator<Item = (PathBuf, BoardDocument)> + use<>> {
        list_documents(&self.layout.boards_dir())
    }
}

fn write_document<T: Serialize>(path: &Path, doc: &T, ctx: &WriteContext) -> SyncResult<()> {
    let content = render_json(doc)?;
    ctx.before_write(path, content_hash(content.as_bytes()));
    atomic_write(path, &content)?;
    debug!(path = %path.display(), "Wrote document");
    Ok(())
}

/// Parse a document, treating a missing or malformed file as absent.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> SyncResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str(&content) {
        Ok(doc) => Ok(Some(doc)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping malformed document");
            Ok(None)
        }
    }
}

fn remove_document(path: &Path, ctx: &WriteContext) -> SyncResult<bool> {
    if !path.exists() {
        return Ok(false);
    }
    ctx.before_remove(path);
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed document");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn json_files(dir: &Path) -> SyncResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if path.is_file() && !hidden && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parsing happens lazily as the iterator is consumed.
fn list_documents<T: DeserializeOwned>(
    dir: &Path,
) -> SyncResult<impl Iterator<Item = (PathBuf, T)> + use<T>> {
    let files = json_files(dir)?;
    Ok(files.into_iter().filter_map(|path| match read_document(&path) {
        Ok(Some(doc)) => Some((path, doc)),
        Ok(None) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable document");
            None
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueStatus, LinkEntry, LinkType};
    use crate::sync::suppress::SelfWriteLedger;
    use tempfile::TempDir;

    fn store() -> (TempDir, DocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("data"));
        store.ensure_directories().unwrap();
        (dir, store)
    }

    #[test]
    fn test_issue_round_trip_preserves_array_order() {
        let (_dir, store) = store();
        let mut doc = IssueDocument::new("ENG-1".into(), "ENG".into(), "First".into());
        doc.labels = vec!["z".into(), "a".into()];
        doc.links = vec![
            LinkEntry::new(LinkType::RelatesTo, "ENG-9"),
            LinkEntry::new(LinkType::Blocks, "ENG-2"),
        ];

        store.write_issue(&doc, Lifecycle::Active, &WriteContext::detached()).unwrap();
        let read = store.read_issue("ENG-1", Lifecycle::Active).unwrap().unwrap();

        assert_eq!(read, doc);
    }

    #[test]
    fn test_read_any_checks_in_order() {
        let (_dir, store) = store();
        let ctx = WriteContext::detached();
        let mut doc = IssueDocument::new("ENG-1".into(), "ENG".into(), "x".into());
        doc.status = IssueStatus::Deleted;
        store.write_issue(&doc, Lifecycle::Deleted, &ctx).unwrap();

        let (found, lc) = store.read_issue_any("ENG-1").unwrap().unwrap();
        assert_eq!(lc, Lifecycle::Deleted);
        assert_eq!(found.status, IssueStatus::Deleted);

        store.write_issue(&doc, Lifecycle::Archived, &ctx).unwrap();
        assert_eq!(store.read_issue_any("ENG-1").unwrap().unwrap().1, Lifecycle::Archived);
        assert_eq!(
            store.issue_locations("ENG-1"),
            vec![Lifecycle::Archived, Lifecycle::Deleted]
        );
    }

    #[test]
    fn test_malformed_document_is_absent_and_skipped() {
        let (_dir, store) = store();
        let path = store.layout().issue_file("ENG-1", Lifecycle::Active);
        fs::write(&path, "{ not json").unwrap();
        let good = IssueDocument::new("ENG-2".into(), "ENG".into(), "ok".into());
        store.write_issue(&good, Lifecycle::Active, &WriteContext::detached()).unwrap();

        assert!(store.read_issue("ENG-1", Lifecycle::Active).unwrap().is_none());
        let listed: Vec<_> = store
            .list_issues(Lifecycle::Active)
            .unwrap()
            .map(|(_, d)| d.tracking_id)
            .collect();
        assert_eq!(listed, vec!["ENG-2".to_string()]);
    }

    #[test]
    fn test_delete_absent_is_not_an_error() {
        let (_dir, store) = store();
        assert!(!store.delete_project("NOPE", &WriteContext::detached()).unwrap());
        assert!(!store.delete_board("NOPE", &WriteContext::detached()).unwrap());
    }

    #[test]
    fn test_move_issue_leaves_one_copy() {
        let (_dir, store) = store();
        let ctx = WriteContext::detached();
        let mut doc = IssueDocument::new("ENG-1".into(), "ENG".into(), "x".into());
        store.write_issue(&doc, Lifecycle::Active, &ctx).unwrap();

        doc.status = IssueStatus::Archived;
        store.move_issue(&doc, Lifecycle::Active, Lifecycle::Archived, &ctx).unwrap();

        assert_eq!(store.issue_locations("ENG-1"), vec![Lifecycle::Archived]);
    }

    #[test]
    fn test_internal_writes_are_marked() {
        let (_dir, store) = store();
        let ledger = SelfWriteLedger::default();
        let ctx = WriteContext::internal(&ledger);
        let project = ProjectDocument::new("ENG".into(), "Engineering".into());

        let path = store.write_project(&project, &ctx).unwrap();
        assert!(ledger.is_self_write(&path));

        store.delete_project("ENG", &ctx).unwrap();
        assert!(ledger.is_self_write(&path));
    }

    #[test]
    fn test_board_filename() {
        let (_dir, store) = store();
        let board = BoardDocument::with_defaults("ENG".into(), "Engineering Board".into());
        let path = store.write_board(&board, &WriteContext::detached()).unwrap();
        assert!(path.ends_with("boards/ENG-board.json"));
        assert_eq!(store.list_boards().unwrap().count(), 1);
    }
}
