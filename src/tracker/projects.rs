//! Project operations.

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{now, BoardDocument, IssueStatus, ProjectDocument, ProjectStatus};
use crate::storage::ProjectRow;
use crate::sync::Reconciler;
use crate::tracker::{BulkResult, Tracker};
use crate::validate::is_valid_project_key;

/// Fields for a new project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    /// Lead email.
    pub lead: Option<String>,
}

/// Fields to change on an existing project. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lead: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// A project with its issue counts.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: ProjectRow,
    pub issue_count: usize,
    pub by_status: Vec<(String, usize)>,
}

impl Tracker {
    /// Create a project and its default board.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or taken, or a write fails.
    pub fn create_project(&mut self, input: NewProject) -> Result<ProjectDocument> {
        let key = input.key.trim().to_uppercase();
        if !is_valid_project_key(&key) {
            return Err(Error::InvalidArgument(format!(
                "invalid project key '{}'",
                input.key
            )));
        }
        if input.name.trim().is_empty() {
            return Err(Error::InvalidArgument("project name cannot be empty".into()));
        }
        if self.store.read_project(&key)?.is_some() || self.storage.get_project(&key)?.is_some() {
            return Err(Error::DuplicateProject { key });
        }

        let mut project = ProjectDocument::new(key, input.name.trim().to_string());
        project.description = input.description;
        project.lead = input.lead;
        let board = BoardDocument::with_defaults(project.key.clone(), project.default_board_name());

        self.store.write_project(&project, &self.writes)?;
        self.store.write_board(&board, &self.writes)?;

        let layout = self.store.layout();
        self.storage.mutate("create_project", &self.actor, |tx, _ctx| {
            let reconciler = Reconciler::new(tx, layout);
            reconciler.sync_project(&project)?;
            reconciler.sync_board(&board)?;
            Ok(())
        })?;

        info!(key = %project.key, "Created project");
        Ok(project)
    }

    /// Read-modify-write a project document, then reindex it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] if no document exists for `key`.
    pub fn update_project(&mut self, key: &str, patch: ProjectPatch) -> Result<ProjectDocument> {
        let mut project = self.load_project(key)?;
        if let Some(name) = patch.name {
            project.name = name;
        }
        if let Some(description) = patch.description {
            project.description = Some(description);
        }
        if let Some(lead) = patch.lead {
            project.lead = Some(lead);
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        project.updated_at = Some(now());
        self.write_and_sync_project(&project, "update_project")?;
        Ok(project)
    }

    /// Archive every live issue of the project, one transition each, then
    /// mark the project archived.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or its document cannot
    /// be rewritten. Per-issue failures are reported in the result instead.
    pub fn archive_project(&mut self, key: &str) -> Result<BulkResult> {
        let mut project = self.load_project(key)?;
        let ids = self.storage.live_issue_ids(&project.key)?;
        let result = self.bulk_transition(&ids, IssueStatus::Archived);

        project.status = ProjectStatus::Archived;
        project.updated_at = Some(now());
        self.write_and_sync_project(&project, "archive_project")?;

        info!(key = %project.key, archived = result.succeeded.len(), failed = result.failed.len(), "Archived project");
        Ok(result)
    }

    /// Remove a project that owns no issues: index rows first, then files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectHasIssues`] if any issue still belongs to it.
    pub fn delete_project(&mut self, key: &str) -> Result<()> {
        let key = key.trim().to_uppercase();
        if self.storage.get_project(&key)?.is_none() && self.store.read_project(&key)?.is_none() {
            return Err(Error::ProjectNotFound { key });
        }
        let count = self.storage.count_project_issues(&key)?;
        if count > 0 {
            return Err(Error::ProjectHasIssues { key, count });
        }

        self.storage.delete_project(&key, &self.actor)?;
        self.store.delete_board(&key, &self.writes)?;
        self.store.delete_project(&key, &self.writes)?;
        info!(key = %key, "Deleted project");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the index query fails.
    pub fn list_projects(&self, include_archived: bool) -> Result<Vec<ProjectRow>> {
        self.storage.list_projects(include_archived)
    }

    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] if the project is not indexed.
    pub fn show_project(&self, key: &str) -> Result<ProjectSummary> {
        let key = key.trim().to_uppercase();
        let project = self
            .storage
            .get_project(&key)?
            .ok_or_else(|| Error::ProjectNotFound { key: key.clone() })?;
        let by_status = self.storage.project_status_counts(&key)?;
        let issue_count = by_status.iter().map(|(_, n)| n).sum();
        Ok(ProjectSummary {
            project,
            issue_count,
            by_status,
        })
    }

    pub(crate) fn load_project(&self, key: &str) -> Result<ProjectDocument> {
        let key = key.trim().to_uppercase();
        self.store
            .read_project(&key)?
            .ok_or(Error::ProjectNotFound { key })
    }

    fn write_and_sync_project(&mut self, project: &ProjectDocument, op: &str) -> Result<()> {
        self.store.write_project(project, &self.writes)?;
        let layout = self.store.layout();
        self.storage.mutate(op, &self.actor, |tx, _ctx| {
            Reconciler::new(tx, layout).sync_project(project)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{IssueStatus, Lifecycle};
    use crate::storage::get_transitions;
    use crate::tracker::test_support::{tracker, tracker_with_project};
    use crate::tracker::NewIssue;

    use super::*;

    #[test]
    fn test_create_writes_project_and_default_board() {
        let mut t = tracker();
        let project = t
            .create_project(NewProject {
                key: "eng".into(),
                name: "Engineering".into(),
                ..NewProject::default()
            })
            .unwrap();

        assert_eq!(project.key, "ENG");
        assert!(t.store().layout().project_file("ENG").exists());
        let board = t.store().read_board("ENG").unwrap().unwrap();
        assert_eq!(board.name, "Engineering Board");
        assert_eq!(board.columns.len(), 5);
        assert_eq!(t.storage().get_board("ENG").unwrap().unwrap().columns.len(), 5);
    }

    #[test]
    fn test_create_rejects_bad_and_duplicate_keys() {
        let mut t = tracker_with_project();
        let bad = t.create_project(NewProject {
            key: "1X".into(),
            name: "Bad".into(),
            ..NewProject::default()
        });
        assert!(matches!(bad, Err(Error::InvalidArgument(_))));

        let dup = t.create_project(NewProject {
            key: "ENG".into(),
            name: "Again".into(),
            ..NewProject::default()
        });
        assert!(matches!(dup, Err(Error::DuplicateProject { .. })));
    }

    #[test]
    fn test_update_rewrites_document_and_index() {
        let mut t = tracker_with_project();
        t.update_project(
            "ENG",
            ProjectPatch {
                name: Some("Platform".into()),
                ..ProjectPatch::default()
            },
        )
        .unwrap();

        assert_eq!(t.store().read_project("ENG").unwrap().unwrap().name, "Platform");
        assert_eq!(t.show_project("ENG").unwrap().project.name, "Platform");
    }

    #[test]
    fn test_archive_cascades_to_live_issues() {
        let mut t = tracker_with_project();
        let a = t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        let b = t.create_issue("ENG", NewIssue::titled("b")).unwrap();
        let c = t.create_issue("ENG", NewIssue::titled("c")).unwrap();
        t.transition(&c.tracking_id, IssueStatus::Deleted).unwrap();

        let result = t.archive_project("ENG").unwrap();

        assert_eq!(result.succeeded, vec![a.tracking_id.clone(), b.tracking_id.clone()]);
        assert!(result.failed.is_empty());
        assert_eq!(t.store().locate_issue(&a.tracking_id), Some(Lifecycle::Archived));
        assert_eq!(t.store().locate_issue(&c.tracking_id), Some(Lifecycle::Deleted));
        assert_eq!(get_transitions(t.storage().conn(), &a.tracking_id).unwrap().len(), 1);
        assert_eq!(t.show_project("ENG").unwrap().project.status, "archived");
        assert!(t.list_projects(false).unwrap().is_empty());
        assert_eq!(t.list_projects(true).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_refused_while_issues_exist() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();

        let err = t.delete_project("ENG").unwrap_err();
        assert!(matches!(err, Error::ProjectHasIssues { count: 1, .. }));
        assert!(t.store().layout().project_file("ENG").exists());
    }

    #[test]
    fn test_delete_empty_project_removes_files_and_rows() {
        let mut t = tracker_with_project();
        t.delete_project("ENG").unwrap();

        assert!(!t.store().layout().project_file("ENG").exists());
        assert!(!t.store().layout().board_file("ENG").exists());
        assert!(t.storage().get_project("ENG").unwrap().is_none());
        assert!(matches!(
            t.delete_project("ENG"),
            Err(Error::ProjectNotFound { .. })
        ));
    }
}
