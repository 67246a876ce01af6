//! Sync types shared by the document store, reconciler and watcher.

use serde::Serialize;

use crate::model::Lifecycle;

/// The kinds of document the data root holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Project,
    Issue,
    Board,
}

impl DocumentKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Issue => "issue",
            Self::Board => "board",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a path under the data root points, as far as its location tells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub kind: DocumentKind,
    /// Lifecycle directory, for issues only.
    pub lifecycle: Option<Lifecycle>,
    /// Project key, tracking id, or board project key.
    pub key: String,
}

/// Counts produced by a full rebuild.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildStats {
    pub projects: usize,
    pub issues: usize,
    /// Forward edges present after the rebuild.
    pub links: usize,
    pub boards: usize,
    /// Comment rows present after the rebuild.
    pub comments: usize,
}

impl RebuildStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.projects + self.issues + self.links + self.boards + self.comments
    }
}

/// An issue document whose location disagrees with its status.
#[derive(Debug, Clone, Serialize)]
pub struct Misplaced {
    pub tracking_id: String,
    pub status: String,
    pub found_in: Lifecycle,
    pub expected: Lifecycle,
}

/// A link entry pointing at an issue with no document.
#[derive(Debug, Clone, Serialize)]
pub struct DanglingRef {
    pub issue: String,
    pub link_type: String,
    pub target: String,
}

/// An index row that no longer agrees with the document tree.
#[derive(Debug, Clone, Serialize)]
pub struct StaleRow {
    pub tracking_id: String,
    pub status: String,
    pub file_path: String,
    pub reason: String,
}

/// Result of a consistency check over the document tree and the index.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConsistencyReport {
    pub documents_scanned: usize,
    pub misplaced: Vec<Misplaced>,
    /// Tracking ids present in more than one lifecycle directory.
    pub duplicates: Vec<String>,
    pub dangling: Vec<DanglingRef>,
    /// Documents that failed to parse, relative to the data root.
    pub unreadable: Vec<String>,
    pub stale: Vec<StaleRow>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.misplaced.is_empty()
            && self.duplicates.is_empty()
            && self.dangling.is_empty()
            && self.unreadable.is_empty()
            && self.stale.is_empty()
    }
}

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// An issue document names a project the index does not know.
    #[error("{document}: project {project} does not exist")]
    MissingProject {
        /// Path of the offending document, relative to the data root.
        document: String,
        project: String,
    },
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
