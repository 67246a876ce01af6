//! Board operations.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{now, BoardColumn, BoardDocument, IssueStatus};
use crate::storage::{IssueFilter, IssueRow};
use crate::sync::Reconciler;
use crate::tracker::Tracker;

/// A board with the project's live issues placed in its columns.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub project: String,
    pub name: String,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub name: String,
    pub status_mapping: String,
    pub wip_limit: Option<u32>,
    pub issues: Vec<IssueRow>,
}

impl ColumnView {
    #[must_use]
    pub fn over_limit(&self) -> bool {
        self.wip_limit.is_some_and(|limit| self.issues.len() > limit as usize)
    }
}

impl Tracker {
    /// Show a project's board, creating the default one if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] if the project is not indexed.
    pub fn show_board(&mut self, project_key: &str) -> Result<BoardView> {
        let key = project_key.trim().to_uppercase();
        let project = self
            .storage
            .get_project(&key)?
            .ok_or_else(|| Error::ProjectNotFound { key: key.clone() })?;

        let row = match self.storage.get_board(&key)? {
            Some(row) => row,
            None => {
                let board = match self.store.read_board(&key)? {
                    Some(existing) => existing,
                    None => {
                        let board = BoardDocument::with_defaults(key.clone(), format!("{} Board", project.name));
                        self.store.write_board(&board, &self.writes)?;
                        info!(project = %key, "Created default board");
                        board
                    }
                };
                self.sync_board(&board)?;
                self.storage
                    .get_board(&key)?
                    .ok_or_else(|| Error::BoardNotFound { key: key.clone() })?
            }
        };

        let issues = self.storage.list_issues(&IssueFilter {
            project_key: Some(key.clone()),
            ..IssueFilter::default()
        })?;
        let mut by_status: HashMap<String, Vec<IssueRow>> = HashMap::new();
        for issue in issues {
            by_status.entry(issue.status.clone()).or_default().push(issue);
        }

        let columns = row
            .columns
            .into_iter()
            .map(|column| ColumnView {
                issues: by_status.remove(&column.status_mapping).unwrap_or_default(),
                name: column.name,
                status_mapping: column.status_mapping,
                wip_limit: column.wip_limit,
            })
            .collect();

        Ok(BoardView {
            project: key,
            name: row.name,
            columns,
        })
    }

    /// Rename a board or replace its columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoardNotFound`] if the project has no board document,
    /// or [`Error::InvalidArgument`] if a column maps to an unknown status.
    pub fn update_board(
        &mut self,
        project_key: &str,
        name: Option<String>,
        columns: Option<Vec<BoardColumn>>,
    ) -> Result<BoardDocument> {
        let key = project_key.trim().to_uppercase();
        let mut board = self
            .store
            .read_board(&key)?
            .ok_or_else(|| Error::BoardNotFound { key: key.clone() })?;

        if let Some(name) = name {
            board.name = name;
        }
        if let Some(columns) = columns {
            for column in &columns {
                column.status_mapping.parse::<IssueStatus>()?;
            }
            board.columns = columns;
        }
        board.updated_at = Some(now());

        self.store.write_board(&board, &self.writes)?;
        self.sync_board(&board)?;
        info!(project = %key, "Updated board");
        Ok(board)
    }

    fn sync_board(&mut self, board: &BoardDocument) -> Result<()> {
        let layout = self.store.layout();
        self.storage.mutate("sync_board", &self.actor, |tx, _ctx| {
            Reconciler::new(tx, layout).sync_board(board)?;
            Ok(())
        })
    }
}
