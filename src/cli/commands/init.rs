//! Initialize the document tree and the index.
//!
//! The data root gets one directory per document kind and lifecycle:
//! `projects/`, `issues/`, `archive/issues/`, `deleted/issues/`, `boards/`.
//! The index is created beside it. With `--force` an existing index is
//! dropped and rebuilt from whatever documents are already on disk.

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::cli::commands::Context;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use crate::sync::{full_rebuild, DocumentStore, RebuildStats};

#[derive(Serialize)]
struct InitOutput {
    data_dir: PathBuf,
    database: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    rebuilt: Option<RebuildStats>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if both stores exist and `force` is
/// not set, or an error if a directory or the database cannot be created.
pub fn execute(ctx: &Context, force: bool, json: bool) -> Result<()> {
    let store = DocumentStore::new(&ctx.data_dir);
    let initialized = store.layout().projects_dir().is_dir() && ctx.db_path.exists();
    if initialized && !force {
        return Err(Error::AlreadyInitialized {
            path: ctx.data_dir.clone(),
        });
    }

    store.ensure_directories()?;
    if force && ctx.db_path.exists() {
        fs::remove_file(&ctx.db_path)?;
    }
    let mut storage = SqliteStorage::open(&ctx.db_path)?;
    let rebuilt = if force {
        Some(full_rebuild(&mut storage, &store, &ctx.actor)?)
    } else {
        None
    };

    if json {
        let output = InitOutput {
            data_dir: ctx.data_dir.clone(),
            database: ctx.db_path.clone(),
            rebuilt,
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
    } else {
        println!("Initialized tracker");
        println!("  Data root: {}", ctx.data_dir.display());
        println!("  Index:     {}", ctx.db_path.display());
        if let Some(stats) = rebuilt {
            println!("  Reindexed {} projects, {} issues", stats.projects, stats.issues);
        }
        println!();
        println!("Next: sm project create <KEY> <NAME>");
    }

    Ok(())
}
