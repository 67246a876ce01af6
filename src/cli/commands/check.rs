//! Consistency check between the document tree and the index.

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{print_json, Context};
use crate::error::Result;
use crate::sync::{check_consistency, full_rebuild, ConsistencyReport, RebuildStats};

#[derive(Serialize)]
struct CheckOutput {
    clean: bool,
    report: ConsistencyReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    rebuilt: Option<RebuildStats>,
}

/// Execute the check command. With `fix`, a report with findings triggers a
/// full rebuild.
///
/// # Errors
///
/// Returns an error if the scan or the rebuild fails.
pub fn execute(ctx: &Context, fix: bool, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;
    let report = check_consistency(tracker.storage(), tracker.store())?;

    let rebuilt = if fix && !report.is_clean() {
        let store = tracker.store().clone();
        Some(full_rebuild(tracker.storage_mut(), &store, &ctx.actor)?)
    } else {
        None
    };

    if json {
        return print_json(&CheckOutput {
            clean: report.is_clean(),
            report,
            rebuilt,
        });
    }

    println!("Scanned {} issue document(s)", report.documents_scanned);
    if report.is_clean() {
        println!("{}", "No problems found".green());
        return Ok(());
    }
    for m in &report.misplaced {
        println!(
            "  {} {} has status {} but lives in {} (expected {})",
            "misplaced".yellow(),
            m.tracking_id,
            m.status,
            m.found_in,
            m.expected
        );
    }
    for id in &report.duplicates {
        println!("  {} {id} exists in more than one lifecycle directory", "duplicate".red());
    }
    for d in &report.dangling {
        println!("  {} {} {} {}", "dangling".yellow(), d.issue, d.link_type, d.target);
    }
    for path in &report.unreadable {
        println!("  {} {path}", "unreadable".red());
    }
    for s in &report.stale {
        println!("  {} {} ({}): {}", "stale".yellow(), s.tracking_id, s.file_path, s.reason);
    }
    match rebuilt {
        Some(stats) => println!("Rebuilt index: {} issues, {} links", stats.issues, stats.links),
        None => println!("\nRun `sm check --fix` or `sm repair` to rebuild the index."),
    }
    Ok(())
}
