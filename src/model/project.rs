//! Project document model.
//!
//! Projects own issues and one board. The key is the natural identifier
//! for both the document filename and the tracking-id prefix (e.g. "ENG" -> ENG-1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
}

impl ProjectStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(Error::InvalidArgument(format!(
                "invalid project status '{other}' (expected active or archived)"
            ))),
        }
    }
}

/// The on-disk project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Unique key: 2-10 uppercase alphanumerics, starting with a letter.
    pub key: String,

    pub name: String,

    pub description: Option<String>,

    /// Lead email, resolved against the users table on sync.
    pub lead: Option<String>,

    /// Missing or null in older documents; defaults to active.
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub status: ProjectStatus,

    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectDocument {
    /// Create a new active project document.
    #[must_use]
    pub fn new(key: String, name: String) -> Self {
        let now = super::now();
        Self {
            key,
            name,
            description: None,
            lead: None,
            status: ProjectStatus::Active,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Name of the board created alongside this project.
    #[must_use]
    pub fn default_board_name(&self) -> String {
        format!("{} Board", self.name)
    }
}
