//! Board document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub name: String,
    /// Issue status shown in this column.
    pub status_mapping: String,
    pub wip_limit: Option<u32>,
}

impl BoardColumn {
    fn new(name: &str, status_mapping: &str, wip_limit: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            status_mapping: status_mapping.to_string(),
            wip_limit,
        }
    }
}

/// Columns every new board starts with.
#[must_use]
pub fn default_columns() -> Vec<BoardColumn> {
    vec![
        BoardColumn::new("Backlog", "backlog", None),
        BoardColumn::new("To Do", "todo", None),
        BoardColumn::new("In Progress", "in_progress", Some(5)),
        BoardColumn::new("In Review", "in_review", Some(3)),
        BoardColumn::new("Done", "done", None),
    ]
}

/// The on-disk board document, one per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    /// Key of the owning project.
    pub project: String,
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub columns: Vec<BoardColumn>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BoardDocument {
    /// A board with the default column set.
    #[must_use]
    pub fn with_defaults(project: String, name: String) -> Self {
        let now = super::now();
        Self {
            project,
            name,
            columns: default_columns(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_columns_wip_limits() {
        let columns = default_columns();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[2].status_mapping, "in_progress");
        assert_eq!(columns[2].wip_limit, Some(5));
        assert_eq!(columns[3].wip_limit, Some(3));
        assert!(columns[0].wip_limit.is_none());
    }
}
