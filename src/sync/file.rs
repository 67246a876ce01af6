//! Atomic file operations for the document tree.
//!
//! Writers never leave a half-written `.json` file behind: content goes to a
//! hidden temp file in the same directory, is synced, then renamed over the
//! target.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::sync::types::SyncResult;

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a hidden temporary file beside the target
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> SyncResult<()> {
    let temp_path = temp_path_for(path);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Write to temp file
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        // Sync to disk before rename
        writer.get_ref().sync_all()?;
    }

    // Atomic rename
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Serialize a document the way every document on disk is laid out:
/// pretty-printed with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json<T: Serialize>(value: &T) -> SyncResult<String> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    Ok(content)
}

/// Atomically write a document as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> SyncResult<()> {
    atomic_write(path, &render_json(value)?)
}

// The temp name does not end in `.json`, so watchers filtering on the
// extension never see it.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let temp_name = format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple());
    path.with_file_name(temp_name)
}
