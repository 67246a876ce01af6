//! Document models for the tracker.
//!
//! This module contains the typed shape of every canonical JSON document:
//! - Project
//! - Issue (with links and comments)
//! - Board

pub mod board;
pub mod issue;
pub mod project;

pub use board::{BoardColumn, BoardDocument, default_columns};
pub use issue::{
    CommentEntry, IssueDocument, IssueStatus, IssueType, Lifecycle, LinkEntry, LinkType, Priority,
};
pub use project::{ProjectDocument, ProjectStatus};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Current time at the millisecond precision the index stores.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

// ==================
// Lenient Deserializers
// ==================

/// Deserialize a defaulted field, reading an explicit `null` as the default.
///
/// Pair with `#[serde(default)]` so a missing key behaves the same way.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize an optional `YYYY-MM-DD` date.
///
/// `null`, an empty string and an unparseable value all read as `None`; a
/// full timestamp keeps its date part.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let date_part = raw.split_once('T').map_or(raw, |(date, _)| date);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Ok(Some(date)),
        Err(_) => {
            warn!(value = raw, "Ignoring unparseable due_date");
            Ok(None)
        }
    }
}
