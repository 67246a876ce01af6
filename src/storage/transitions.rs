//! Status transition log.
//!
//! One append-only row per status change, lifecycle moves included.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// A transition row, keyed by the issue's tracking id.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    #[serde(skip_serializing)]
    pub id: i64,
    pub tracking_id: String,
    pub from_status: String,
    pub to_status: String,
    pub actor: Option<String>,
    /// Unix milliseconds.
    pub transitioned_at: i64,
}

impl Transition {
    /// Create a new transition (id will be assigned by database).
    #[must_use]
    pub fn new(tracking_id: &str, from_status: &str, to_status: &str, at_millis: i64) -> Self {
        Self {
            id: 0,
            tracking_id: tracking_id.to_string(),
            from_status: from_status.to_string(),
            to_status: to_status.to_string(),
            actor: None,
            transitioned_at: at_millis,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }
}

/// Insert a transition for an indexed issue.
///
/// # Errors
///
/// Returns `QueryReturnedNoRows` if the issue is not in the index, or any
/// insert failure.
pub fn insert_transition(conn: &Connection, transition: &Transition) -> Result<i64> {
    let inserted = conn.execute(
        "INSERT INTO transitions (issue_id, from_status, to_status, actor, transitioned_at)
         SELECT id, ?2, ?3, ?4, ?5 FROM issues WHERE tracking_id = ?1",
        rusqlite::params![
            transition.tracking_id,
            transition.from_status,
            transition.to_status,
            transition.actor,
            transition.transitioned_at,
        ],
    )?;
    if inserted == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(conn.last_insert_rowid())
}

/// Get the transitions of an issue, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_transitions(conn: &Connection, tracking_id: &str) -> Result<Vec<Transition>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, i.tracking_id, t.from_status, t.to_status, t.actor, t.transitioned_at
         FROM transitions t
         JOIN issues i ON i.id = t.issue_id
         WHERE i.tracking_id = ?1
         ORDER BY t.transitioned_at ASC, t.id ASC",
    )?;

    let rows = stmt.query_map([tracking_id], |row| {
        Ok(Transition {
            id: row.get(0)?,
            tracking_id: row.get(1)?,
            from_status: row.get(2)?,
            to_status: row.get(3)?,
            actor: row.get(4)?,
            transitioned_at: row.get(5)?,
        })
    })?;

    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_transition_insert_and_get() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO projects (key, name, created_at, updated_at) VALUES ('ENG', 'Eng', 0, 0);
             INSERT INTO issues (tracking_id, project_id, title, file_path, created_at, updated_at)
                VALUES ('ENG-1', 1, 'a', 'issues/ENG-1.json', 0, 0);",
        )
        .unwrap();

        let first = Transition::new("ENG-1", "backlog", "todo", 10).with_actor("ada@example.com");
        let second = Transition::new("ENG-1", "todo", "archived", 20);
        assert!(insert_transition(&conn, &first).unwrap() > 0);
        insert_transition(&conn, &second).unwrap();

        let log = get_transitions(&conn, "ENG-1").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].to_status, "todo");
        assert_eq!(log[0].actor.as_deref(), Some("ada@example.com"));
        assert_eq!(log[1].to_status, "archived");
    }

    #[test]
    fn test_transition_for_unknown_issue_fails() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let orphan = Transition::new("ENG-404", "backlog", "todo", 0);
        assert!(matches!(
            insert_transition(&conn, &orphan),
            Err(rusqlite::Error::QueryReturnedNoRows)
        ));
    }
}
