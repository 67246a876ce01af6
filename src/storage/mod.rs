//! SQLite index layer for the tracker.
//!
//! This module provides the derived index using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - An append-only transition log for status history
//!
//! Nothing here is authoritative: every row can be regenerated from the
//! document tree by a full rebuild.
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation
//! - [`transitions`] - Status transition log

pub mod migrations;
pub mod schema;
pub mod sqlite;
pub mod transitions;

pub use sqlite::{
    BoardRow, CommentRow, IndexCounts, IssueFilter, IssueRow, MutationContext, ProjectRow,
    SqliteStorage, User,
};
pub use transitions::{get_transitions, Transition};
