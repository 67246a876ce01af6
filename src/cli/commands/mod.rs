//! Command implementations.

pub mod board;
pub mod check;
pub mod completions;
pub mod init;
pub mod issue;
pub mod project;
pub mod repair;
pub mod user;
pub mod version;
pub mod watch;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{default_actor, resolve_data_dir, resolve_db_path};
use crate::error::{Error, Result};
use crate::model::{IssueStatus, IssueType, LinkEntry, Priority};
use crate::tracker::Tracker;
use crate::validate::{normalize_link_type, normalize_priority, normalize_status, normalize_type};

/// Where the two stores live and who is acting.
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub actor: String,
}

impl Context {
    /// Resolve flags, environment and platform defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no data directory can be determined.
    pub fn resolve(data_dir: Option<&Path>, db: Option<&Path>, actor: Option<&str>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir)
            .ok_or_else(|| Error::Config("Could not determine the data directory".to_string()))?;
        let db_path = resolve_db_path(db, &data_dir)
            .ok_or_else(|| Error::Config("Could not determine the index path".to_string()))?;
        let actor = actor.map_or_else(default_actor, String::from);
        Ok(Self {
            data_dir,
            db_path,
            actor,
        })
    }

    /// Open the tracker over an initialized data root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if `sm init` has not been run.
    pub fn open_tracker(&self) -> Result<Tracker> {
        Tracker::open(&self.data_dir, &self.db_path, self.actor.clone())
    }
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn with_suggestion(kind: &str, (input, suggestion): (String, Option<String>)) -> Error {
    match suggestion {
        Some(s) => Error::InvalidArgument(format!("invalid {kind} '{input}' (did you mean {s}?)")),
        None => Error::InvalidArgument(format!("invalid {kind} '{input}'")),
    }
}

pub(crate) fn parse_status(input: &str) -> Result<IssueStatus> {
    normalize_status(input).map_err(|e| with_suggestion("status", e))
}

pub(crate) fn parse_type(input: &str) -> Result<IssueType> {
    normalize_type(input).map_err(|e| with_suggestion("type", e))
}

pub(crate) fn parse_priority(input: &str) -> Result<Priority> {
    normalize_priority(input).map_err(|(input, hint)| {
        Error::InvalidArgument(format!(
            "invalid priority '{input}'{}",
            hint.map(|h| format!(" ({h})")).unwrap_or_default()
        ))
    })
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidArgument(format!("invalid due date '{input}' (expected YYYY-MM-DD)")))
}

/// Parse `TYPE:ID`, e.g. `blocks:ENG-1`.
pub(crate) fn parse_link(input: &str) -> Result<LinkEntry> {
    let (kind, target) = input
        .split_once(':')
        .ok_or_else(|| Error::InvalidArgument(format!("invalid link '{input}' (expected TYPE:ID)")))?;
    let kind = normalize_link_type(kind).map_err(|e| with_suggestion("link type", e))?;
    let target = target.trim().to_uppercase();
    if target.is_empty() {
        return Err(Error::InvalidArgument(format!("invalid link '{input}' (missing target)")));
    }
    Ok(LinkEntry::new(kind, target))
}
