//! Project management commands.
//!
//! - `sm project create <KEY> <NAME>` - Create a project and its board
//! - `sm project list` - List projects
//! - `sm project show <KEY>` - Show a project with issue counts
//! - `sm project update <KEY>` - Update project fields
//! - `sm project archive <KEY>` - Archive the project and its live issues
//! - `sm project delete <KEY>` - Delete a project without issues

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{format_timestamp, print_json, Context};
use crate::cli::{ProjectCommands, ProjectCreateArgs, ProjectUpdateArgs};
use crate::error::Result;
use crate::model::ProjectStatus;
use crate::storage::ProjectRow;
use crate::tracker::{BulkResult, NewProject, ProjectPatch, Tracker};

#[derive(Serialize)]
struct ProjectListOutput<'a> {
    projects: &'a [ProjectRow],
    count: usize,
}

#[derive(Serialize)]
struct ArchiveOutput<'a> {
    key: &'a str,
    #[serde(flatten)]
    result: &'a BulkResult,
}

/// Execute a project command.
///
/// # Errors
///
/// Returns an error if the tracker is not initialized or the operation fails.
pub fn execute(command: &ProjectCommands, ctx: &Context, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;

    match command {
        ProjectCommands::Create(args) => execute_create(&mut tracker, args, json),
        ProjectCommands::List { all } => execute_list(&tracker, *all, json),
        ProjectCommands::Show { key } => execute_show(&tracker, key, json),
        ProjectCommands::Update(args) => execute_update(&mut tracker, args, json),
        ProjectCommands::Archive { key } => execute_archive(&mut tracker, key, json),
        ProjectCommands::Delete { key } => execute_delete(&mut tracker, key, json),
    }
}

fn execute_create(tracker: &mut Tracker, args: &ProjectCreateArgs, json: bool) -> Result<()> {
    let project = tracker.create_project(NewProject {
        key: args.key.clone(),
        name: args.name.clone(),
        description: args.description.clone(),
        lead: args.lead.clone(),
    })?;

    if json {
        print_json(&project)?;
    } else {
        println!("Created project {} ({})", project.key.bold(), project.name);
        println!("  Board: {}", project.default_board_name());
    }
    Ok(())
}

fn execute_list(tracker: &Tracker, all: bool, json: bool) -> Result<()> {
    let projects = tracker.list_projects(all)?;

    if json {
        return print_json(&ProjectListOutput {
            projects: &projects,
            count: projects.len(),
        });
    }
    if projects.is_empty() {
        println!("No projects found.");
        println!("\nCreate one with: sm project create <KEY> <NAME>");
        return Ok(());
    }

    println!("Projects ({}):", projects.len());
    for project in &projects {
        let status = if project.status == ProjectStatus::Archived.as_str() {
            format!(" [{}]", project.status).dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {:<10} {}{}", project.key.bold(), project.name, status);
    }
    Ok(())
}

fn execute_show(tracker: &Tracker, key: &str, json: bool) -> Result<()> {
    let summary = tracker.show_project(key)?;

    if json {
        return print_json(&summary);
    }
    let p = &summary.project;
    println!("{} {}", p.key.bold(), p.name);
    println!("  Status:  {}", p.status);
    if let Some(description) = &p.description {
        println!("  About:   {description}");
    }
    if let Some(lead) = &p.lead {
        println!("  Lead:    {lead}");
    }
    println!("  Created: {}", format_timestamp(p.created_at));
    println!("  Issues:  {}", summary.issue_count);
    for (status, count) in &summary.by_status {
        println!("    {status:<12} {count}");
    }
    Ok(())
}

fn execute_update(tracker: &mut Tracker, args: &ProjectUpdateArgs, json: bool) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .transpose()?;
    let project = tracker.update_project(
        &args.key,
        ProjectPatch {
            name: args.name.clone(),
            description: args.description.clone(),
            lead: args.lead.clone(),
            status,
        },
    )?;

    if json {
        print_json(&project)?;
    } else {
        println!("Updated project {}", project.key.bold());
    }
    Ok(())
}

fn execute_archive(tracker: &mut Tracker, key: &str, json: bool) -> Result<()> {
    let key = key.trim().to_uppercase();
    let result = tracker.archive_project(&key)?;

    if json {
        return print_json(&ArchiveOutput {
            key: &key,
            result: &result,
        });
    }
    println!(
        "Archived project {} and {} issue(s)",
        key.bold(),
        result.succeeded.len()
    );
    for failure in &result.failed {
        println!("  {} {}: {}", "failed".red(), failure.tracking_id, failure.error);
    }
    Ok(())
}

fn execute_delete(tracker: &mut Tracker, key: &str, json: bool) -> Result<()> {
    let key = key.trim().to_uppercase();
    tracker.delete_project(&key)?;

    if json {
        print_json(&serde_json::json!({ "key": key, "deleted": true }))?;
    } else {
        println!("Deleted project {}", key.bold());
    }
    Ok(())
}
