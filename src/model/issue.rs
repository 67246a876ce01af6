//! Issue document model.
//!
//! An issue document is the canonical, hand-editable JSON form of an issue.
//! Its `status` alone decides which lifecycle directory the file lives in.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of work an issue tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Epic,
    Story,
    #[default]
    Task,
    Bug,
    Spike,
    Decision,
}

impl IssueType {
    pub const ALL: [Self; 6] = [
        Self::Epic,
        Self::Story,
        Self::Task,
        Self::Bug,
        Self::Spike,
        Self::Decision,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Story => "story",
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Spike => "spike",
            Self::Decision => "decision",
        }
    }
}

impl FromStr for IssueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown issue type '{s}'")))
    }
}

/// Issue status. The last two are lifecycle states with their own directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
    Archived,
    Deleted,
}

impl IssueStatus {
    pub const ALL: [Self; 8] = [
        Self::Backlog,
        Self::Todo,
        Self::InProgress,
        Self::InReview,
        Self::Done,
        Self::Cancelled,
        Self::Archived,
        Self::Deleted,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// The lifecycle directory an issue with this status belongs in.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Archived => Lifecycle::Archived,
            Self::Deleted => Lifecycle::Deleted,
            _ => Lifecycle::Active,
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid status '{s}'")))
    }
}

/// Physical location category of an issue document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Archived,
    Deleted,
}

impl Lifecycle {
    /// Search order for lookups that ignore lifecycle state.
    pub const ALL: [Self; 3] = [Self::Active, Self::Archived, Self::Deleted];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid priority '{s}'")))
    }
}

/// Relation between two issues.
///
/// Only the forward half (`blocks`, `parent`, `relates_to`, `duplicates`) is
/// ever stored in the index; `blocked_by` and `child` are computed views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Blocks,
    BlockedBy,
    Parent,
    Child,
    RelatesTo,
    Duplicates,
}

impl LinkType {
    pub const ALL: [Self; 6] = [
        Self::Blocks,
        Self::BlockedBy,
        Self::Parent,
        Self::Child,
        Self::RelatesTo,
        Self::Duplicates,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::BlockedBy => "blocked_by",
            Self::Parent => "parent",
            Self::Child => "child",
            Self::RelatesTo => "relates_to",
            Self::Duplicates => "duplicates",
        }
    }

    /// The same relation seen from the other end.
    #[must_use]
    pub const fn reverse(&self) -> Self {
        match self {
            Self::Blocks => Self::BlockedBy,
            Self::BlockedBy => Self::Blocks,
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
            Self::RelatesTo => Self::RelatesTo,
            Self::Duplicates => Self::Duplicates,
        }
    }

    /// Whether this half of the relation is the one persisted in the index.
    #[must_use]
    pub const fn is_forward(&self) -> bool {
        !matches!(self, Self::BlockedBy | Self::Child)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown link type '{s}'")))
    }
}

/// One entry of an issue document's `links` array.
///
/// The type is kept as written so hand-edited documents with an unknown
/// type still load; reconciliation ignores entries it cannot parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    #[serde(rename = "type")]
    pub link_type: String,
    #[serde(rename = "ref")]
    pub target: String,
}

impl LinkEntry {
    #[must_use]
    pub fn new(link_type: LinkType, target: impl Into<String>) -> Self {
        Self {
            link_type: link_type.as_str().to_string(),
            target: target.into(),
        }
    }

    /// Parsed link type, `None` if the document holds an unknown type.
    #[must_use]
    pub fn kind(&self) -> Option<LinkType> {
        self.link_type.parse().ok()
    }
}

/// One entry of an issue document's `comments` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub author: Option<String>,
    pub body: String,
    pub at: DateTime<Utc>,
}

/// The on-disk issue document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDocument {
    pub tracking_id: String,
    /// Key of the owning project.
    pub project: String,
    #[serde(rename = "type", default, deserialize_with = "super::null_as_default")]
    pub issue_type: IssueType,
    pub title: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub status: IssueStatus,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub priority: Priority,
    /// Assignee email.
    pub assignee: Option<String>,
    /// Reporter email.
    pub reporter: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub labels: Vec<String>,
    pub story_points: Option<i64>,
    pub sprint: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub links: Vec<LinkEntry>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub comments: Vec<CommentEntry>,
    /// Set when the issue is archived. Kept through a later delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IssueDocument {
    /// Create a fresh backlog issue with default type and priority.
    #[must_use]
    pub fn new(tracking_id: String, project: String, title: String) -> Self {
        let now = super::now();
        Self {
            tracking_id,
            project,
            issue_type: IssueType::default(),
            title,
            description: None,
            status: IssueStatus::default(),
            priority: Priority::default(),
            assignee: None,
            reporter: None,
            labels: Vec::new(),
            story_points: None,
            sprint: None,
            due_date: None,
            links: Vec::new(),
            comments: Vec::new(),
            archived_at: None,
            deleted_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Lifecycle directory this document belongs in according to its status.
    #[must_use]
    pub const fn expected_lifecycle(&self) -> Lifecycle {
        self.status.lifecycle()
    }

    /// Creation time, falling back to `updated_at` and then the epoch for
    /// documents written before timestamps were recorded.
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.created_at.or(self.updated_at).unwrap_or_default()
    }

    /// Last modification time, falling back to the creation time.
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or_else(|| self.created())
    }

    /// Set the status, bump `updated_at` and stamp the lifecycle change.
    ///
    /// Archiving sets `archived_at` and clears `deleted_at`. Deleting sets
    /// `deleted_at` and leaves `archived_at` alone. Any other status clears
    /// both.
    pub fn set_status(&mut self, status: IssueStatus, at: DateTime<Utc>) {
        match status.lifecycle() {
            Lifecycle::Archived => {
                self.archived_at = Some(at);
                self.deleted_at = None;
            }
            Lifecycle::Deleted => self.deleted_at = Some(at),
            Lifecycle::Active => {
                self.archived_at = None;
                self.deleted_at = None;
            }
        }
        self.status = status;
        self.updated_at = Some(at);
    }

    /// Drop every link entry pointing at `target`. Returns how many were removed.
    pub fn strip_links_to(&mut self, target: &str) -> usize {
        let before = self.links.len();
        self.links.retain(|l| l.target != target);
        before - self.links.len()
    }
}
