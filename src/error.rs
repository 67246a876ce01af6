//! Error types for the sm tracker.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    IssueNotFound,
    ProjectNotFound,
    BoardNotFound,

    // Validation (exit 4)
    ValidationFailed,
    InvalidTransition,
    InvalidArgument,
    DuplicateKey,

    // Dependency (exit 5)
    HasDependents,

    // Sync (exit 6)
    SyncError,
    RebuildFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    WatchError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::BoardNotFound => "BOARD_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::HasDependents => "HAS_DEPENDENTS",
            Self::SyncError => "SYNC_ERROR",
            Self::RebuildFailed => "REBUILD_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::WatchError => "WATCH_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::IssueNotFound | Self::ProjectNotFound | Self::BoardNotFound => 3,
            Self::ValidationFailed
            | Self::InvalidTransition
            | Self::InvalidArgument
            | Self::DuplicateKey => 4,
            Self::HasDependents => 5,
            Self::SyncError | Self::RebuildFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::WatchError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    ///
    /// True for validation errors and busy databases. False for not-found,
    /// I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::InvalidTransition
                | Self::InvalidArgument
                | Self::DuplicateKey
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in tracker operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `sm init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    #[error("Issue not found: {id} (did you mean: {}?)", similar.join(", "))]
    IssueNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Project not found: {key}")]
    ProjectNotFound { key: String },

    #[error("Board not found for project {key}")]
    BoardNotFound { key: String },

    /// One message per rejected reference; the write did not happen.
    #[error("Validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("Invalid transition for {id}: {reason}")]
    InvalidTransition { id: String, reason: String },

    #[error("Project {key} already exists")]
    DuplicateProject { key: String },

    #[error("Project {key} still has {count} issue(s)")]
    ProjectHasIssues { key: String, count: usize },

    #[error("Rebuild failed at {document}: {reason}")]
    RebuildFailed { document: String, reason: String },

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::IssueNotFound { .. } | Self::IssueNotFoundSimilar { .. } => {
                ErrorCode::IssueNotFound
            }
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::BoardNotFound { .. } => ErrorCode::BoardNotFound,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::DuplicateProject { .. } => ErrorCode::DuplicateKey,
            Self::ProjectHasIssues { .. } => ErrorCode::HasDependents,
            Self::RebuildFailed { .. } => ErrorCode::RebuildFailed,
            Self::Sync(_) => ErrorCode::SyncError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Watch(_) => ErrorCode::WatchError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `sm init` to create the data directories".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Data root already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::IssueNotFound { id } => Some(format!(
                "No issue with ID '{id}'. Use `sm issue list <PROJECT>` to see available issues."
            )),
            Self::IssueNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::ProjectNotFound { key } => Some(format!(
                "No project with key '{key}'. Use `sm project list` to see available projects."
            )),

            Self::BoardNotFound { key } => Some(format!(
                "Run `sm board show {key}` to create the default board."
            )),

            Self::InvalidTransition { reason, .. } if reason.starts_with("Cannot transition a deleted") => Some(
                "Deleted issues only leave that state through `sm issue recover <ID>`".to_string(),
            ),

            Self::ProjectHasIssues { key, .. } => Some(format!(
                "Purge the issues of {key} first, or archive the project with `sm project archive {key}`."
            )),

            Self::RebuildFailed { document, .. } => Some(format!(
                "Fix or move {document}, then run `sm repair` again. The index was left unchanged."
            )),

            Self::InvalidArgument(msg) => {
                if msg.contains("status") {
                    Some(
                        "Valid statuses: backlog, todo, in_progress, in_review, done, cancelled, \
                         archived, deleted. Synonyms: wip→in_progress, review→in_review, closed→done"
                            .to_string(),
                    )
                } else if msg.contains("type") && !msg.contains("link") {
                    Some(
                        "Valid types: epic, story, task, bug, spike, decision. \
                         Synonyms: feature→story, defect→bug, research→spike"
                            .to_string(),
                    )
                } else if msg.contains("priority") {
                    Some("Valid priorities: critical, high, medium, low, or P0-P3".to_string())
                } else if msg.contains("link") {
                    Some(
                        "Valid link types: blocks, blocked_by, parent, child, relates_to, duplicates"
                            .to_string(),
                    )
                } else if msg.contains("key") {
                    Some(
                        "Project keys are 2-10 uppercase letters or digits, starting with a letter"
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::Validation { .. }
            | Self::InvalidTransition { .. }
            | Self::DuplicateProject { .. }
            | Self::Sync(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Watch(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Self::Validation { errors } = self {
            obj["error"]["errors"] = serde_json::json!(errors);
        }

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
