//! Board commands.

use colored::Colorize;

use crate::cli::commands::{print_json, Context};
use crate::cli::BoardCommands;
use crate::error::{Error, Result};
use crate::model::BoardColumn;

/// Execute a board command.
///
/// # Errors
///
/// Returns an error if the tracker is not initialized, the column JSON is
/// malformed, or the operation fails.
pub fn execute(command: &BoardCommands, ctx: &Context, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;

    match command {
        BoardCommands::Show { project } => {
            let view = tracker.show_board(project)?;
            if json {
                return print_json(&view);
            }
            println!("{} ({})", view.name.bold(), view.project);
            for column in &view.columns {
                let limit = column
                    .wip_limit
                    .map(|l| format!("{}/{l}", column.issues.len()))
                    .unwrap_or_else(|| column.issues.len().to_string());
                let limit = if column.over_limit() {
                    limit.red().to_string()
                } else {
                    limit.dimmed().to_string()
                };
                println!();
                println!("{} {limit}", column.name.cyan().bold());
                for issue in &column.issues {
                    println!("  {:<10} {}", issue.tracking_id, issue.title);
                }
            }
            Ok(())
        }
        BoardCommands::Update {
            project,
            name,
            columns,
        } => {
            let columns = columns
                .as_deref()
                .map(|raw| {
                    serde_json::from_str::<Vec<BoardColumn>>(raw).map_err(|e| {
                        Error::InvalidArgument(format!("invalid columns JSON: {e}"))
                    })
                })
                .transpose()?;
            let board = tracker.update_board(project, name.clone(), columns)?;
            if json {
                print_json(&board)
            } else {
                println!("Updated board {} ({} columns)", board.name.bold(), board.columns.len());
                Ok(())
            }
        }
    }
}
