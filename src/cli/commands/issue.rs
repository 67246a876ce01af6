//! Issue command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{
    format_timestamp, parse_date, parse_link, parse_priority, parse_status, parse_type, print_json,
    Context,
};
use crate::cli::{IssueCommands, IssueCreateArgs, IssueListArgs, IssueUpdateArgs};
use crate::error::Result;
use crate::model::{IssueDocument, IssueStatus, LinkEntry};
use crate::storage::{IssueFilter, IssueRow};
use crate::tracker::{BulkResult, IssuePatch, NewIssue, Tracker};

#[derive(Serialize)]
struct IssueListOutput<'a> {
    issues: &'a [IssueRow],
    count: usize,
}

#[derive(Serialize)]
struct PurgeOutput {
    tracking_id: String,
    references_removed: usize,
}

/// Execute an issue command.
///
/// # Errors
///
/// Returns an error if the tracker is not initialized, an argument does not
/// parse, or the operation fails.
pub fn execute(command: &IssueCommands, ctx: &Context, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;

    match command {
        IssueCommands::Create(args) => execute_create(&mut tracker, args, json),
        IssueCommands::List(args) => execute_list(&tracker, args, json),
        IssueCommands::Show { id } => execute_show(&tracker, &normalize_id(id), json),
        IssueCommands::Update(args) => execute_update(&mut tracker, args, json),
        IssueCommands::Transition { id, status } => {
            let status = parse_status(status)?;
            let doc = tracker.transition(&normalize_id(id), status)?;
            print_doc(&doc, "Moved", json)
        }
        IssueCommands::Archive { ids } => {
            let result = tracker.bulk_transition(&normalize_ids(ids), IssueStatus::Archived);
            print_bulk(&result, "Archived", json)
        }
        IssueCommands::Delete { ids, purge: false } => {
            let result = tracker.bulk_transition(&normalize_ids(ids), IssueStatus::Deleted);
            print_bulk(&result, "Deleted", json)
        }
        IssueCommands::Delete { ids, purge: true } => execute_purge(&mut tracker, ids, json),
        IssueCommands::Recover { ids } => {
            let result = tracker.bulk_recover(&normalize_ids(ids));
            print_bulk(&result, "Recovered", json)
        }
        IssueCommands::Comment { id, body } => {
            let comment = tracker.add_comment(&normalize_id(id), body)?;
            if json {
                print_json(&comment)
            } else {
                println!("Commented on {}", normalize_id(id).bold());
                Ok(())
            }
        }
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}

fn normalize_ids(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| normalize_id(id)).collect()
}

fn parse_links(raw: &[String]) -> Result<Vec<LinkEntry>> {
    raw.iter().map(|l| parse_link(l)).collect()
}

fn execute_create(tracker: &mut Tracker, args: &IssueCreateArgs, json: bool) -> Result<()> {
    let input = NewIssue {
        title: args.title.clone(),
        description: args.description.clone(),
        issue_type: args.issue_type.as_deref().map(parse_type).transpose()?.unwrap_or_default(),
        priority: args.priority.as_deref().map(parse_priority).transpose()?.unwrap_or_default(),
        assignee: args.assignee.clone(),
        labels: args.labels.iter().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect(),
        story_points: args.points,
        sprint: args.sprint.clone(),
        due_date: args.due.as_deref().map(parse_date).transpose()?,
        links: parse_links(&args.links)?,
    };
    let doc = tracker.create_issue(&args.project, input)?;
    print_doc(&doc, "Created", json)
}

fn execute_list(tracker: &Tracker, args: &IssueListArgs, json: bool) -> Result<()> {
    let filter = IssueFilter {
        project_key: args.project.as_deref().map(normalize_id),
        status: args.status.as_deref().map(parse_status).transpose()?,
        issue_type: args.issue_type.as_deref().map(parse_type).transpose()?,
        include_archived: args.archived,
        include_deleted: args.deleted,
        limit: args.limit,
    };
    let issues = tracker.list_issues(&filter)?;

    if json {
        return print_json(&IssueListOutput {
            issues: &issues,
            count: issues.len(),
        });
    }
    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }
    for issue in &issues {
        println!(
            "{:<10} {:<12} {:<8} {} {}",
            issue.tracking_id.bold(),
            status_label(&issue.status),
            issue.priority,
            issue.title,
            format!("[{}]", issue.issue_type).dimmed()
        );
    }
    Ok(())
}

fn execute_show(tracker: &Tracker, id: &str, json: bool) -> Result<()> {
    let details = tracker.show_issue(id)?;
    if json {
        return print_json(&details);
    }

    let issue = &details.issue;
    println!("{} {}", issue.tracking_id.bold(), issue.title);
    println!("  Status:   {}", status_label(&issue.status));
    println!("  Type:     {}", issue.issue_type);
    println!("  Priority: {}", issue.priority);
    if let Some(assignee) = &issue.assignee {
        println!("  Assignee: {assignee}");
    }
    if let Some(reporter) = &issue.reporter {
        println!("  Reporter: {reporter}");
    }
    if !issue.labels.is_empty() {
        println!("  Labels:   {}", issue.labels.join(", "));
    }
    if let Some(points) = issue.story_points {
        println!("  Points:   {points}");
    }
    if let Some(sprint) = &issue.sprint {
        println!("  Sprint:   {sprint}");
    }
    if let Some(due) = &issue.due_date {
        println!("  Due:      {due}");
    }
    println!("  File:     {}", issue.file_path.dimmed());
    println!("  Updated:  {}", format_timestamp(issue.updated_at));
    if let Some(description) = &issue.description {
        println!();
        println!("{description}");
    }

    if !details.links.is_empty() {
        println!();
        println!("{}", "Links".cyan().bold());
        for link in &details.links {
            println!("  {:<11} {}", link.link_type, link.target);
        }
    }
    if !details.comments.is_empty() {
        println!();
        println!("{}", "Comments".cyan().bold());
        for comment in &details.comments {
            let author = comment.author.as_deref().unwrap_or("unknown");
            println!(
                "  {} {}",
                format!("{author} @ {}", format_timestamp(comment.created_at)).dimmed(),
                comment.body
            );
        }
    }
    if !details.transitions.is_empty() {
        println!();
        println!("{}", "History".cyan().bold());
        for t in &details.transitions {
            println!(
                "  {} {} -> {} {}",
                format_timestamp(t.transitioned_at).dimmed(),
                t.from_status,
                t.to_status,
                t.actor.as_deref().unwrap_or_default().dimmed()
            );
        }
    }
    Ok(())
}

fn execute_update(tracker: &mut Tracker, args: &IssueUpdateArgs, json: bool) -> Result<()> {
    let links = if args.clear_links {
        Some(Vec::new())
    } else if args.links.is_empty() {
        None
    } else {
        Some(parse_links(&args.links)?)
    };
    let patch = IssuePatch {
        title: args.title.clone(),
        description: args.description.clone(),
        issue_type: args.issue_type.as_deref().map(parse_type).transpose()?,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        assignee: args.assignee.clone(),
        labels: args.labels.clone(),
        story_points: args.points,
        sprint: args.sprint.clone(),
        due_date: args.due.as_deref().map(parse_date).transpose()?,
        links,
    };
    if patch.is_empty() {
        return Err(crate::Error::InvalidArgument(
            "nothing to update; pass at least one field".to_string(),
        ));
    }
    let doc = tracker.update_issue(&normalize_id(&args.id), patch)?;
    print_doc(&doc, "Updated", json)
}

fn execute_purge(tracker: &mut Tracker, ids: &[String], json: bool) -> Result<()> {
    let mut outputs = Vec::new();
    let mut result = BulkResult::default();
    for id in normalize_ids(ids) {
        match tracker.purge_issue(&id) {
            Ok(references_removed) => {
                outputs.push(PurgeOutput {
                    tracking_id: id.clone(),
                    references_removed,
                });
                result.succeeded.push(id);
            }
            Err(e) => result.failed.push(crate::tracker::BulkFailure {
                tracking_id: id,
                error: e.to_string(),
            }),
        }
    }

    if json {
        return print_json(&serde_json::json!({
            "purged": outputs,
            "failed": result.failed,
        }));
    }
    for purged in &outputs {
        println!(
            "Purged {} ({} reference(s) removed)",
            purged.tracking_id.bold(),
            purged.references_removed
        );
    }
    print_failures(&result);
    Ok(())
}

fn print_doc(doc: &IssueDocument, verb: &str, json: bool) -> Result<()> {
    if json {
        return print_json(doc);
    }
    println!(
        "{verb} {} {} ({})",
        doc.tracking_id.bold(),
        doc.title,
        status_label(doc.status.as_str())
    );
    Ok(())
}

fn print_bulk(result: &BulkResult, verb: &str, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }
    if !result.succeeded.is_empty() {
        println!("{verb} {}", result.succeeded.join(", ").bold());
    }
    print_failures(result);
    Ok(())
}

fn print_failures(result: &BulkResult) {
    for failure in &result.failed {
        println!("  {} {}: {}", "failed".red(), failure.tracking_id, failure.error);
    }
}

fn status_label(status: &str) -> String {
    match status {
        "done" => status.green().to_string(),
        "in_progress" | "in_review" => status.yellow().to_string(),
        "archived" | "deleted" | "cancelled" => status.dimmed().to_string(),
        _ => status.to_string(),
    }
}
