//! Foreground watch-sync.

use crate::cli::commands::{print_json, Context};
use crate::config::watch_debounce;
use crate::error::Result;
use crate::sync::{full_rebuild, start_watch, DocumentStore, SelfWriteLedger};

/// Watch the data root and re-sync changed documents until the process is
/// interrupted.
///
/// # Errors
///
/// Returns an error if the tracker is not initialized or the watcher cannot
/// be registered.
pub fn execute(ctx: &Context, rebuild: bool, json: bool) -> Result<()> {
    let mut tracker = ctx.open_tracker()?;
    if rebuild {
        let store = tracker.store().clone();
        let stats = full_rebuild(tracker.storage_mut(), &store, &ctx.actor)?;
        if json {
            print_json(&stats)?;
        }
    }
    // The watcher opens its own connection
    drop(tracker);

    let ledger = SelfWriteLedger::default();
    let handle = start_watch(DocumentStore::new(&ctx.data_dir), &ctx.db_path, ledger, watch_debounce())?;
    if !json {
        println!("Watching {} (Ctrl-C to stop)", ctx.data_dir.display());
    }
    handle.wait();
    Ok(())
}
