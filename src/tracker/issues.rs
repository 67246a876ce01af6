//! Issue operations: create, update, comment, show, list, purge.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{now, CommentEntry, IssueDocument, IssueType, Lifecycle, LinkEntry, Priority};
use crate::storage::{get_transitions, CommentRow, IssueFilter, IssueRow, Transition};
use crate::sync::{next_id, remove_references_to, validate_links};
use crate::tracker::Tracker;

/// Fields for a new issue. Status always starts at `backlog`.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub story_points: Option<i64>,
    pub sprint: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub links: Vec<LinkEntry>,
}

impl NewIssue {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Fields to change on an existing issue. Status is not here: it only moves
/// through [`Tracker::transition`] and [`Tracker::recover`].
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub labels: Option<Vec<String>>,
    pub story_points: Option<i64>,
    pub sprint: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Replaces the whole link set when present.
    pub links: Option<Vec<LinkEntry>>,
}

impl IssuePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.issue_type.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
            && self.story_points.is_none()
            && self.sprint.is_none()
            && self.due_date.is_none()
            && self.links.is_none()
    }
}

/// Everything `sm issue show` prints.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: IssueRow,
    /// Outgoing links plus the reverse view of incoming ones.
    pub links: Vec<LinkEntry>,
    pub comments: Vec<CommentRow>,
    pub transitions: Vec<Transition>,
}

impl Tracker {
    /// Allocate an id, validate links, write the document, then index it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] for an unknown project and
    /// [`Error::Validation`] if any link points at a missing issue. Nothing is
    /// written in either case.
    pub fn create_issue(&mut self, project_key: &str, input: NewIssue) -> Result<IssueDocument> {
        let key = project_key.trim().to_uppercase();
        if self.storage.get_project(&key)?.is_none() {
            return Err(Error::ProjectNotFound { key });
        }
        let title = input.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("issue title cannot be empty".into()));
        }

        let tracking_id = next_id(&self.store, &key)?;
        let mut doc = IssueDocument::new(tracking_id, key, title.to_string());
        doc.description = input.description;
        doc.issue_type = input.issue_type;
        doc.priority = input.priority;
        doc.assignee = input.assignee;
        doc.reporter = Some(self.actor.clone());
        doc.labels = input.labels;
        doc.story_points = input.story_points;
        doc.sprint = input.sprint;
        doc.due_date = input.due_date;
        doc.links = input.links;

        self.check_links(&doc)?;
        self.store.write_issue(&doc, Lifecycle::Active, &self.writes)?;
        self.sync_issue(&doc, Lifecycle::Active, false, "create_issue")?;

        info!(id = %doc.tracking_id, "Created issue");
        Ok(doc)
    }

    /// Apply a patch and rewrite the document where it currently lives.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue is unknown, a new link dangles, or a
    /// write fails.
    pub fn update_issue(&mut self, tracking_id: &str, patch: IssuePatch) -> Result<IssueDocument> {
        let (mut doc, lifecycle) = self.load_issue(tracking_id)?;
        let replace_links = patch.links.is_some();

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidArgument("issue title cannot be empty".into()));
            }
            doc.title = title;
        }
        if let Some(description) = patch.description {
            doc.description = Some(description);
        }
        if let Some(issue_type) = patch.issue_type {
            doc.issue_type = issue_type;
        }
        if let Some(priority) = patch.priority {
            doc.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            doc.assignee = Some(assignee);
        }
        if let Some(labels) = patch.labels {
            doc.labels = labels;
        }
        if let Some(points) = patch.story_points {
            doc.story_points = Some(points);
        }
        if let Some(sprint) = patch.sprint {
            doc.sprint = Some(sprint);
        }
        if let Some(due) = patch.due_date {
            doc.due_date = Some(due);
        }
        if let Some(links) = patch.links {
            doc.links = links;
            self.check_links(&doc)?;
        }
        doc.updated_at = Some(now());

        self.store.write_issue(&doc, lifecycle, &self.writes)?;
        self.sync_issue(&doc, lifecycle, replace_links, "update_issue")?;
        info!(id = %doc.tracking_id, "Updated issue");
        Ok(doc)
    }

    /// Append a comment authored by the actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is blank, the issue is unknown, or a
    /// write fails.
    pub fn add_comment(&mut self, tracking_id: &str, body: &str) -> Result<CommentEntry> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::InvalidArgument("comment body cannot be empty".into()));
        }
        let (mut doc, lifecycle) = self.load_issue(tracking_id)?;
        let at = now();
        let comment = CommentEntry {
            author: Some(self.actor.clone()),
            body: body.to_string(),
            at,
        };
        doc.comments.push(comment.clone());
        doc.updated_at = Some(at);

        self.store.write_issue(&doc, lifecycle, &self.writes)?;
        self.sync_issue(&doc, lifecycle, false, "add_comment")?;
        Ok(comment)
    }

    /// The indexed issue with its links, comments and transition log.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the issue is not indexed.
    pub fn show_issue(&self, tracking_id: &str) -> Result<IssueDetails> {
        let issue = self
            .storage
            .get_issue(tracking_id)?
            .ok_or_else(|| self.issue_not_found(tracking_id))?;
        Ok(IssueDetails {
            links: self.storage.get_issue_links(tracking_id)?,
            comments: self.storage.get_comments(tracking_id)?,
            transitions: get_transitions(self.storage.conn(), tracking_id)?,
            issue,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the index query fails.
    pub fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRow>> {
        self.storage.list_issues(filter)
    }

    /// Permanently remove an issue.
    ///
    /// References from other documents are stripped first, then the index
    /// row goes (cascading to comments, links and transitions), then the
    /// document. Returns how many other documents were rewritten.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no document holds the issue.
    pub fn purge_issue(&mut self, tracking_id: &str) -> Result<usize> {
        self.load_issue(tracking_id)?;

        let rewritten = remove_references_to(&self.store, tracking_id, &self.writes)?;
        for (doc, lifecycle) in &rewritten {
            self.sync_issue(doc, *lifecycle, true, "purge_issue")?;
        }
        self.storage.delete_issue(tracking_id, &self.actor)?;
        let removed = self.store.delete_issue_any(tracking_id, &self.writes)?;

        info!(id = tracking_id, files = removed, references = rewritten.len(), "Purged issue");
        Ok(rewritten.len())
    }

    fn check_links(&self, doc: &IssueDocument) -> Result<()> {
        let errors = validate_links(&self.store, doc)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueStatus, LinkType};
    use crate::tracker::test_support::tracker_with_project;

    fn linked(title: &str, link_type: LinkType, target: &str) -> NewIssue {
        NewIssue {
            links: vec![LinkEntry::new(link_type, target)],
            ..NewIssue::titled(title)
        }
    }

    #[test]
    fn test_create_first_issue_in_active_dir() {
        let mut t = tracker_with_project();
        let doc = t.create_issue("ENG", NewIssue::titled("First")).unwrap();

        assert_eq!(doc.tracking_id, "ENG-1");
        assert_eq!(doc.status, IssueStatus::Backlog);
        assert_eq!(doc.reporter.as_deref(), Some("ada@example.com"));
        assert_eq!(t.store().issue_locations("ENG-1"), vec![Lifecycle::Active]);

        let row = t.storage().get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(row.status, "backlog");
        assert_eq!(row.file_path, "issues/ENG-1.json");
    }

    #[test]
    fn test_ids_increase_per_project() {
        let mut t = tracker_with_project();
        let mut last = 0;
        for n in 0..4 {
            let doc = t.create_issue("ENG", NewIssue::titled(format!("Issue {n}"))).unwrap();
            let (_, suffix) = crate::validate::parse_tracking_id(&doc.tracking_id).unwrap();
            assert!(suffix > last);
            last = suffix;
        }
        assert_eq!(last, 4);
    }

    #[test]
    fn test_create_unknown_project() {
        let mut t = tracker_with_project();
        let err = t.create_issue("OPS", NewIssue::titled("x")).unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound { key } if key == "OPS"));
    }

    #[test]
    fn test_link_shows_reverse_on_target() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("Target")).unwrap();
        t.create_issue("ENG", linked("Blocker", LinkType::Blocks, "ENG-1"))
            .unwrap();

        let blocker = t.show_issue("ENG-2").unwrap();
        assert_eq!(blocker.links, vec![LinkEntry::new(LinkType::Blocks, "ENG-1")]);
        let target = t.show_issue("ENG-1").unwrap();
        assert_eq!(target.links, vec![LinkEntry::new(LinkType::BlockedBy, "ENG-2")]);
    }

    #[test]
    fn test_dangling_link_rejected_without_writing() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        t.create_issue("ENG", NewIssue::titled("b")).unwrap();

        let err = t
            .create_issue("ENG", linked("c", LinkType::Blocks, "ENG-999"))
            .unwrap_err();
        match err {
            Error::Validation { errors } => {
                assert_eq!(errors, vec!["Referenced issue ENG-999 does not exist"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!t.store().issue_exists("ENG-3").unwrap());
        assert!(t.storage().get_issue("ENG-3").unwrap().is_none());
    }

    #[test]
    fn test_update_replaces_links() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        t.create_issue("ENG", NewIssue::titled("b")).unwrap();
        t.create_issue("ENG", linked("c", LinkType::Blocks, "ENG-1"))
            .unwrap();

        let doc = t
            .update_issue(
                "ENG-3",
                IssuePatch {
                    title: Some("c2".into()),
                    links: Some(vec![LinkEntry::new(LinkType::RelatesTo, "ENG-2")]),
                    ..IssuePatch::default()
                },
            )
            .unwrap();

        assert_eq!(doc.title, "c2");
        assert!(t.show_issue("ENG-1").unwrap().links.is_empty());
        assert_eq!(
            t.show_issue("ENG-3").unwrap().links,
            vec![LinkEntry::new(LinkType::RelatesTo, "ENG-2")]
        );
        assert_eq!(t.storage().get_issue("ENG-3").unwrap().unwrap().title, "c2");
    }

    #[test]
    fn test_update_keeps_archived_location() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        t.transition("ENG-1", IssueStatus::Archived).unwrap();

        t.update_issue(
            "ENG-1",
            IssuePatch {
                priority: Some(Priority::High),
                ..IssuePatch::default()
            },
        )
        .unwrap();

        assert_eq!(t.store().issue_locations("ENG-1"), vec![Lifecycle::Archived]);
        let row = t.storage().get_issue("ENG-1").unwrap().unwrap();
        assert_eq!(row.priority, "high");
        assert!(row.archived_at.is_some());
    }

    #[test]
    fn test_comment_written_and_indexed_once() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        t.add_comment("ENG-1", "looks good").unwrap();
        // A second unrelated update re-syncs the same comment array
        t.update_issue(
            "ENG-1",
            IssuePatch {
                sprint: Some("S1".into()),
                ..IssuePatch::default()
            },
        )
        .unwrap();

        let doc = t.store().read_issue("ENG-1", Lifecycle::Active).unwrap().unwrap();
        assert_eq!(doc.comments.len(), 1);
        let comments = t.show_issue("ENG-1").unwrap().comments;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "looks good");
        assert!(t.add_comment("ENG-1", "  ").is_err());
    }

    #[test]
    fn test_purge_strips_references() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        t.create_issue("ENG", linked("b", LinkType::Blocks, "ENG-1"))
            .unwrap();

        let rewritten = t.purge_issue("ENG-1").unwrap();

        assert_eq!(rewritten, 1);
        assert!(!t.store().issue_exists("ENG-1").unwrap());
        assert!(t.storage().get_issue("ENG-1").unwrap().is_none());
        let b = t.store().read_issue("ENG-2", Lifecycle::Active).unwrap().unwrap();
        assert!(b.links.is_empty());
        assert!(t.show_issue("ENG-2").unwrap().links.is_empty());
    }

    #[test]
    fn test_list_hides_archived_by_default() {
        let mut t = tracker_with_project();
        t.create_issue("ENG", NewIssue::titled("a")).unwrap();
        t.create_issue("ENG", NewIssue::titled("b")).unwrap();
        t.transition("ENG-2", IssueStatus::Archived).unwrap();

        let visible = t
            .list_issues(&IssueFilter {
                project_key: Some("ENG".into()),
                ..IssueFilter::default()
            })
            .unwrap();
        assert_eq!(visible.len(), 1);

        let all = t
            .list_issues(&IssueFilter {
                include_archived: true,
                ..IssueFilter::default()
            })
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
