//! Configuration management.
//!
//! This module resolves where the canonical document tree and the derived
//! index live, and who the acting user is.
//!
//! # Architecture
//!
//! The tracker keeps two stores side by side:
//! - **Data root**: the JSON document tree (`projects/`, `issues/`, `archive/`,
//!   `deleted/`, `boards/`). This is the source of truth.
//! - **Index**: a SQLite database next to the data root (never inside it, so
//!   the watcher does not see its own journal files).

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default debounce window for batching filesystem notifications.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// How long a self-write mark suppresses watcher resyncs.
pub const SELF_WRITE_TTL: Duration = Duration::from_secs(5);

/// Filename of the index database.
pub const INDEX_DB_NAME: &str = "index.db";

/// Get the platform base directory for the tracker.
///
/// On Linux this is `~/.local/share/sm-tracker`.
#[must_use]
pub fn global_sm_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sm-tracker").map(|d| d.data_dir().to_path_buf())
}

/// Resolve the data root holding the document tree.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `SM_DATA_DIR` environment variable
/// 3. Global location: `<platform data dir>/sm-tracker/data`
#[must_use]
pub fn resolve_data_dir(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(dir) = std::env::var("SM_DATA_DIR") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }

    global_sm_dir().map(|dir| dir.join("data"))
}

/// Resolve the index database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `SM_DB` environment variable
/// 3. `index.db` beside the data root
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no location found.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>, data_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(db_path) = std::env::var("SM_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    data_dir.parent().map(|parent| parent.join(INDEX_DB_NAME))
}

/// Debounce window for the watcher, overridable with `SM_WATCH_DEBOUNCE_MS`.
#[must_use]
pub fn watch_debounce() -> Duration {
    std::env::var("SM_WATCH_DEBOUNCE_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_WATCH_DEBOUNCE, Duration::from_millis)
}

/// Get the default actor.
///
/// Priority:
/// 1. `SM_ACTOR` environment variable
/// 2. Git user email
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("SM_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    // Emails resolve against the users table, so prefer them over names
    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.email"])
        .output()
    {
        if output.status.success() {
            let email = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !email.is_empty() {
                return email;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        let actor = default_actor();
        assert!(!actor.is_empty());
    }

    #[test]
    fn test_resolve_data_dir_with_explicit() {
        let explicit = PathBuf::from("/custom/tracker/data");
        assert_eq!(resolve_data_dir(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/index.sqlite");
        let result = resolve_db_path(Some(&explicit), Path::new("/srv/data"));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_db_path_sits_beside_data_root() {
        if std::env::var("SM_DB").is_ok() {
            return;
        }
        let result = resolve_db_path(None, Path::new("/srv/tracker/data")).unwrap();
        assert_eq!(result, PathBuf::from("/srv/tracker/index.db"));
    }
}
