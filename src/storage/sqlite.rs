//! SQLite storage implementation.
//!
//! This module provides the index backend using SQLite. It follows the
//! MutationContext pattern for transaction discipline and transition logging.
//! The row-level upserts used by reconciliation are free functions over a
//! `Connection` so they compose inside a caller's transaction.

use crate::error::{Error, Result};
use crate::model::{BoardColumn, BoardDocument, IssueDocument, LinkEntry, LinkType, ProjectDocument};
use crate::model::{IssueStatus, IssueType};
use crate::storage::schema::apply_schema;
use crate::storage::transitions::{insert_transition, Transition};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// This struct is passed to mutation closures to:
/// - Record status transitions for the audit log
/// - Carry the acting user into those rows
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (email or user name).
    pub actor: String,
    /// Transitions to write at the end of the transaction.
    pub transitions: Vec<Transition>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            transitions: Vec::new(),
        }
    }

    /// Record a status transition for this operation.
    pub fn record_transition(
        &mut self,
        tracking_id: &str,
        from: IssueStatus,
        to: IssueStatus,
        at: DateTime<Utc>,
    ) {
        self.transitions.push(
            Transition::new(tracking_id, from.as_str(), to.as_str(), at.timestamp_millis())
                .with_actor(&self.actor),
        );
    }
}

/// Row counts across the core index tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub projects: usize,
    pub issues: usize,
    pub links: usize,
    pub boards: usize,
    pub comments: usize,
    pub transitions: usize,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes recorded transitions
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for transition in &ctx.transitions {
            insert_transition(&tx, transition)?;
        }

        tx.commit()?;

        Ok(result)
    }

    // ===============
    // User Operations
    // ===============

    /// Add a user, or update the name of an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn add_user(
        &mut self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO users (email, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(email) DO UPDATE SET
               first_name = excluded.first_name,
               last_name = excluded.last_name",
            rusqlite::params![email, first_name, last_name, now],
        )?;
        user_id_by_email(&self.conn, email)?
            .ok_or_else(|| Error::Other(format!("user {email} vanished after insert")))
    }

    /// List all users ordered by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, first_name, last_name FROM users ORDER BY email")?;
        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // ==================
    // Project Operations
    // ==================

    /// Get a project by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project(&self, key: &str) -> Result<Option<ProjectRow>> {
        let project = self
            .conn
            .query_row(
                "SELECT p.id, p.key, p.name, p.description, u.email, p.status, p.created_at, p.updated_at
                 FROM projects p LEFT JOIN users u ON u.id = p.lead_id
                 WHERE p.key = ?1",
                [key],
                map_project_row,
            )
            .optional()?;
        Ok(project)
    }

    /// List projects ordered by key. Archived projects are hidden unless requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self, include_archived: bool) -> Result<Vec<ProjectRow>> {
        let sql = if include_archived {
            "SELECT p.id, p.key, p.name, p.description, u.email, p.status, p.created_at, p.updated_at
             FROM projects p LEFT JOIN users u ON u.id = p.lead_id
             ORDER BY p.key"
        } else {
            "SELECT p.id, p.key, p.name, p.description, u.email, p.status, p.created_at, p.updated_at
             FROM projects p LEFT JOIN users u ON u.id = p.lead_id
             WHERE p.status != 'archived'
             ORDER BY p.key"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], map_project_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Issue counts for a project, grouped by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn project_status_counts(&self, key: &str) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.status, COUNT(*) FROM issues i
             JOIN projects p ON p.id = i.project_id
             WHERE p.key = ?1
             GROUP BY i.status ORDER BY i.status",
        )?;
        let rows = stmt.query_map([key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            let (status, count) = row?;
            counts.push((status, usize::try_from(count).unwrap_or(0)));
        }
        Ok(counts)
    }

    /// Total number of indexed issues (any status) owned by a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_project_issues(&self, key: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM issues i JOIN projects p ON p.id = i.project_id WHERE p.key = ?1",
            [key],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Tracking ids of a project's issues that are neither archived nor deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn live_issue_ids(&self, key: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.tracking_id FROM issues i
             JOIN projects p ON p.id = i.project_id
             WHERE p.key = ?1 AND i.status NOT IN ('archived', 'deleted')
             ORDER BY i.id",
        )?;
        let rows = stmt.query_map([key], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Remove a project's index rows (board first, then the project).
    ///
    /// Returns `false` if no project with that key was indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_project(&mut self, key: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_project", actor, |tx, _ctx| {
            forget_document_hashes(tx, "board", key)?;
            forget_document_hashes(tx, "project", key)?;
            delete_board_by_project_key(tx, key)?;
            Ok(delete_project_by_key(tx, key)?)
        })
    }

    // ================
    // Issue Operations
    // ================

    /// Get an issue by tracking id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_issue(&self, tracking_id: &str) -> Result<Option<IssueRow>> {
        let sql = format!("{ISSUE_SELECT} WHERE i.tracking_id = ?1");
        let issue = self
            .conn
            .query_row(&sql, [tracking_id], map_issue_row)
            .optional()?;
        Ok(issue)
    }

    /// List issues with filters, ordered by tracking id.
    ///
    /// Archived and deleted issues are excluded unless requested, or unless
    /// the status filter asks for them explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRow>> {
        let mut sql = format!("{ISSUE_SELECT} WHERE 1 = 1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(key) = &filter.project_key {
            sql.push_str(" AND p.key = ?");
            params.push(Box::new(key.clone()));
        }

        if let Some(status) = filter.status {
            sql.push_str(" AND i.status = ?");
            params.push(Box::new(status.as_str()));
        } else {
            if !filter.include_archived {
                sql.push_str(" AND i.status != 'archived'");
            }
            if !filter.include_deleted {
                sql.push_str(" AND i.status != 'deleted'");
            }
        }

        if let Some(t) = filter.issue_type {
            sql.push_str(" AND i.issue_type = ?");
            params.push(Box::new(t.as_str()));
        }

        // Numeric ordering within a key: ENG-2 before ENG-10
        sql.push_str(
            " ORDER BY p.key, CAST(SUBSTR(i.tracking_id, INSTR(i.tracking_id, '-') + 1) AS INTEGER)",
        );

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
        let rows = stmt.query_map(params_refs.as_slice(), map_issue_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Links of an issue: stored outgoing edges plus the computed reverse of
    /// every incoming edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_issue_links(&self, tracking_id: &str) -> Result<Vec<LinkEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.link_type, t.tracking_id, 0 FROM issue_links l
               JOIN issues s ON s.id = l.source_issue_id
               JOIN issues t ON t.id = l.target_issue_id
              WHERE s.tracking_id = ?1
             UNION ALL
             SELECT l.link_type, s.tracking_id, 1 FROM issue_links l
               JOIN issues s ON s.id = l.source_issue_id
               JOIN issues t ON t.id = l.target_issue_id
              WHERE t.tracking_id = ?1",
        )?;
        let rows = stmt.query_map([tracking_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;

        let mut links = Vec::new();
        for row in rows {
            let (link_type, other, incoming) = row?;
            let link_type: LinkType = link_type.parse()?;
            let shown = if incoming { link_type.reverse() } else { link_type };
            links.push(LinkEntry::new(shown, other));
        }
        Ok(links)
    }

    /// Comments of an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_comments(&self, tracking_id: &str) -> Result<Vec<CommentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, u.email, c.body, c.created_at FROM comments c
             JOIN issues i ON i.id = c.issue_id
             LEFT JOIN users u ON u.id = c.author_id
             WHERE i.tracking_id = ?1
             ORDER BY c.created_at ASC, c.id ASC",
        )?;
        let rows = stmt.query_map([tracking_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                author: row.get(1)?,
                body: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Every indexed tracking id (for "did you mean" suggestions).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_tracking_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tracking_id FROM issues ORDER BY tracking_id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Remove an issue's row, cascading to comments, links and transitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_issue(&mut self, tracking_id: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_issue", actor, |tx, _ctx| {
            forget_document_hashes(tx, "issue", tracking_id)?;
            Ok(delete_issue_by_tracking_id(tx, tracking_id)?)
        })
    }

    // ================
    // Board Operations
    // ================

    /// Get the board of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_board(&self, project_key: &str) -> Result<Option<BoardRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT b.id, p.key, b.name, b.columns, b.created_at, b.updated_at
                 FROM boards b JOIN projects p ON p.id = b.project_id
                 WHERE p.key = ?1",
                [project_key],
                |row| {
                    let columns: String = row.get(3)?;
                    Ok(BoardRow {
                        id: row.get(0)?,
                        project_key: row.get(1)?,
                        name: row.get(2)?,
                        columns: serde_json::from_str(&columns).unwrap_or_default(),
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ======================
    // Consistency Support
    // ======================

    /// Content hash recorded when the document at `path` was last indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn indexed_hash(&self, path: &str) -> Result<Option<String>> {
        Ok(document_hash(&self.conn, path)?)
    }

    /// Row counts across the core tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn index_counts(&self) -> Result<IndexCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };
        Ok(IndexCounts {
            projects: count("projects")?,
            issues: count("issues")?,
            links: count("issue_links")?,
            boards: count("boards")?,
            comments: count("comments")?,
            transitions: count("transitions")?,
        })
    }

    /// `(tracking_id, status, file_path)` for every indexed issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn issue_locations(&self) -> Result<Vec<(String, String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tracking_id, status, file_path FROM issues ORDER BY tracking_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

// ======================
// Lookups
// ======================

/// Resolve a user email to its id. Unknown emails resolve to `None`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn user_id_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM users WHERE email = ?1", [email], |row| row.get(0))
        .optional()
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn project_id_by_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM projects WHERE key = ?1", [key], |row| row.get(0))
        .optional()
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn issue_id_by_tracking_id(conn: &Connection, tracking_id: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM issues WHERE tracking_id = ?1",
        [tracking_id],
        |row| row.get(0),
    )
    .optional()
}

// ======================
// Upsert Operations (for reconciliation)
// ======================

/// Upsert a project row keyed by project key. Returns the row id.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn upsert_project_row(
    conn: &Connection,
    doc: &ProjectDocument,
    lead_id: Option<i64>,
) -> rusqlite::Result<i64> {
    let created = doc.created_at.or(doc.updated_at).unwrap_or_default();
    let updated = doc.updated_at.unwrap_or(created);
    conn.query_row(
        "INSERT INTO projects (key, name, description, lead_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(key) DO UPDATE SET
           name = excluded.name,
           description = excluded.description,
           lead_id = excluded.lead_id,
           status = excluded.status,
           created_at = excluded.created_at,
           updated_at = excluded.updated_at
         RETURNING id",
        rusqlite::params![
            doc.key,
            doc.name,
            doc.description,
            lead_id,
            doc.status.as_str(),
            created.timestamp_millis(),
            updated.timestamp_millis(),
        ],
        |row| row.get(0),
    )
}

/// Resolved references and lifecycle fields for an issue upsert.
#[derive(Debug, Clone)]
pub struct IssueRowRefs<'a> {
    pub project_id: i64,
    pub assignee_id: Option<i64>,
    pub reporter_id: Option<i64>,
    /// Path relative to the data root.
    pub file_path: &'a str,
    pub archived_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

/// Upsert an issue row keyed by tracking id. Returns the row id.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn upsert_issue_row(
    conn: &Connection,
    doc: &IssueDocument,
    refs: &IssueRowRefs<'_>,
) -> rusqlite::Result<i64> {
    let labels = serde_json::to_string(&doc.labels)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.query_row(
        "INSERT INTO issues (tracking_id, project_id, issue_type, title, description, status, priority,
                             assignee_id, reporter_id, labels, story_points, sprint, due_date, file_path,
                             archived_at, deleted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(tracking_id) DO UPDATE SET
           project_id = excluded.project_id,
           issue_type = excluded.issue_type,
           title = excluded.title,
           description = excluded.description,
           status = excluded.status,
           priority = excluded.priority,
           assignee_id = excluded.assignee_id,
           reporter_id = excluded.reporter_id,
           labels = excluded.labels,
           story_points = excluded.story_points,
           sprint = excluded.sprint,
           due_date = excluded.due_date,
           file_path = excluded.file_path,
           archived_at = excluded.archived_at,
           deleted_at = excluded.deleted_at,
           created_at = excluded.created_at,
           updated_at = excluded.updated_at
         RETURNING id",
        rusqlite::params![
            doc.tracking_id,
            refs.project_id,
            doc.issue_type.as_str(),
            doc.title,
            doc.description,
            doc.status.as_str(),
            doc.priority.as_str(),
            refs.assignee_id,
            refs.reporter_id,
            labels,
            doc.story_points,
            doc.sprint,
            doc.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            refs.file_path,
            refs.archived_at,
            refs.deleted_at,
            doc.created().timestamp_millis(),
            doc.updated().timestamp_millis(),
        ],
        |row| row.get(0),
    )
}

/// Insert a comment unless one with the same body and timestamp exists.
///
/// Returns `true` if a row was inserted.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_comment_if_missing(
    conn: &Connection,
    issue_id: i64,
    author_id: Option<i64>,
    body: &str,
    created_at: i64,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO comments (issue_id, author_id, body, created_at)
         SELECT ?1, ?2, ?3, ?4
         WHERE NOT EXISTS (
           SELECT 1 FROM comments WHERE issue_id = ?1 AND body = ?3 AND created_at = ?4
         )",
        rusqlite::params![issue_id, author_id, body, created_at],
    )?;
    Ok(inserted > 0)
}

/// Insert a forward edge; an existing identical edge counts as satisfied.
///
/// Returns `true` if a new row was inserted.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_link_if_missing(
    conn: &Connection,
    source_id: i64,
    target_id: i64,
    link_type: LinkType,
    created_at: i64,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO issue_links (source_issue_id, target_issue_id, link_type, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(source_issue_id, target_issue_id, link_type) DO NOTHING",
        rusqlite::params![source_id, target_id, link_type.as_str(), created_at],
    )?;
    Ok(inserted > 0)
}

/// Drop every outgoing edge of an issue.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_outgoing_links(conn: &Connection, source_id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM issue_links WHERE source_issue_id = ?1", [source_id])
}

/// Upsert a board row keyed by project. Returns the row id.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn upsert_board_row(
    conn: &Connection,
    doc: &BoardDocument,
    project_id: i64,
) -> rusqlite::Result<i64> {
    let columns = serde_json::to_string(&doc.columns)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let created = doc.created_at.or(doc.updated_at).unwrap_or_default();
    let updated = doc.updated_at.unwrap_or(created);
    conn.query_row(
        "INSERT INTO boards (project_id, name, columns, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(project_id) DO UPDATE SET
           name = excluded.name,
           columns = excluded.columns,
           created_at = excluded.created_at,
           updated_at = excluded.updated_at
         RETURNING id",
        rusqlite::params![
            project_id,
            doc.name,
            columns,
            created.timestamp_millis(),
            updated.timestamp_millis(),
        ],
        |row| row.get(0),
    )
}

/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_project_by_key(conn: &Connection, key: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM projects WHERE key = ?1", [key])? > 0)
}

/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_issue_by_tracking_id(conn: &Connection, tracking_id: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM issues WHERE tracking_id = ?1", [tracking_id])? > 0)
}

/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_board_by_project_key(conn: &Connection, key: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute(
        "DELETE FROM boards WHERE project_id IN (SELECT id FROM projects WHERE key = ?1)",
        [key],
    )? > 0)
}

// ======================
// Document Hashes
// ======================

/// Record the content hash of the document at `path` (relative to the data
/// root). `None` forgets the path instead.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn record_document_hash(
    conn: &Connection,
    path: &str,
    kind: &str,
    key: &str,
    hash: Option<&str>,
) -> rusqlite::Result<()> {
    match hash {
        Some(hash) => conn.execute(
            "INSERT INTO document_hashes (path, kind, doc_key, content_hash, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
               kind = excluded.kind,
               doc_key = excluded.doc_key,
               content_hash = excluded.content_hash,
               indexed_at = excluded.indexed_at",
            rusqlite::params![path, kind, key, hash, chrono::Utc::now().timestamp_millis()],
        )?,
        None => conn.execute("DELETE FROM document_hashes WHERE path = ?1", [path])?,
    };
    Ok(())
}

/// Forget every recorded path of one document.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn forget_document_hashes(conn: &Connection, kind: &str, key: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM document_hashes WHERE kind = ?1 AND doc_key = ?2",
        [kind, key],
    )
}

/// Forget the recorded paths of every issue of a project, ahead of the
/// project row cascading them away.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn forget_project_issue_hashes(conn: &Connection, key: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM document_hashes
          WHERE kind = 'issue' AND doc_key IN (
            SELECT i.tracking_id FROM issues i JOIN projects p ON p.id = i.project_id
             WHERE p.key = ?1
          )",
        [key],
    )
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn document_hash(conn: &Connection, path: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT content_hash FROM document_hashes WHERE path = ?1",
        [path],
        |row| row.get(0),
    )
    .optional()
}

/// Delete every row of every core table, children first. Users are kept.
///
/// # Errors
///
/// Returns an error if any delete fails.
pub fn wipe_index(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "DELETE FROM document_hashes;
         DELETE FROM transitions;
         DELETE FROM comments;
         DELETE FROM issue_links;
         DELETE FROM issues;
         DELETE FROM boards;
         DELETE FROM projects;",
    )
}

const ISSUE_SELECT: &str = "SELECT i.id, i.tracking_id, p.key, i.issue_type, i.title, i.description, i.status,
        i.priority, a.email, r.email, i.labels, i.story_points, i.sprint, i.due_date, i.file_path,
        i.archived_at, i.deleted_at, i.created_at, i.updated_at
   FROM issues i
   JOIN projects p ON p.id = i.project_id
   LEFT JOIN users a ON a.id = i.assignee_id
   LEFT JOIN users r ON r.id = i.reporter_id";

fn map_issue_row(row: &rusqlite::Row) -> rusqlite::Result<IssueRow> {
    let labels: String = row.get(10)?;
    Ok(IssueRow {
        id: row.get(0)?,
        tracking_id: row.get(1)?,
        project_key: row.get(2)?,
        issue_type: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        status: row.get(6)?,
        priority: row.get(7)?,
        assignee: row.get(8)?,
        reporter: row.get(9)?,
        labels: serde_json::from_str(&labels).unwrap_or_default(),
        story_points: row.get(11)?,
        sprint: row.get(12)?,
        due_date: row.get(13)?,
        file_path: row.get(14)?,
        archived_at: row.get(15)?,
        deleted_at: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn map_project_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        key: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        lead: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

// ==================
// Data Structures
// ==================

/// A user from the identity table.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// First and last name joined, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() { self.email.clone() } else { name }
    }
}

/// A project as seen by the index.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    /// Lead email, if the lead resolved to a user.
    pub lead: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An issue as seen by the index.
#[derive(Debug, Clone, Serialize)]
pub struct IssueRow {
    pub id: i64,
    pub tracking_id: String,
    pub project_key: String,
    pub issue_type: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub labels: Vec<String>,
    pub story_points: Option<i64>,
    pub sprint: Option<String>,
    pub due_date: Option<String>,
    pub file_path: String,
    pub archived_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRow {
    pub id: i64,
    pub author: Option<String>,
    pub body: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardRow {
    pub id: i64,
    pub project_key: String,
    pub name: String,
    pub columns: Vec<BoardColumn>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Filters for [`SqliteStorage::list_issues`].
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub project_key: Option<String>,
    pub status: Option<IssueStatus>,
    pub issue_type: Option<IssueType>,
    pub include_archived: bool,
    pub include_deleted: bool,
    pub limit: Option<u32>,
}
