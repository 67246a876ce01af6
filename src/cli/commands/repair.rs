//! Rebuild the index from the document tree.

use crate::cli::commands::{print_json, Context};
use crate::error::Result;
use crate::sync::full_rebuild;

/// Execute the repair command.
///
/// # Errors
///
/// Returns [`crate::Error::RebuildFailed`] naming the document that could not
/// be indexed. The previous index is kept in that case.
pub fn execute(ctx: &Context, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;
    let store = tracker.store().clone();
    let stats = full_rebuild(tracker.storage_mut(), &store, &ctx.actor)?;

    if json {
        print_json(&stats)
    } else {
        println!("Rebuilt index from {}", ctx.data_dir.display());
        println!("  Projects: {}", stats.projects);
        println!("  Issues:   {}", stats.issues);
        println!("  Links:    {}", stats.links);
        println!("  Boards:   {}", stats.boards);
        println!("  Comments: {}", stats.comments);
        Ok(())
    }
}
