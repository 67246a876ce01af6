//! Tracking id allocation.
//!
//! Ids are `<KEY>-<n>` with `n` one past the highest suffix found on disk.
//! The scan covers every lifecycle directory so an archived or deleted id is
//! never handed out again. Allocation is read-then-decide with no lock: two
//! concurrent callers for the same project can pick the same number.

use crate::model::Lifecycle;
use crate::sync::store::DocumentStore;
use crate::sync::types::SyncResult;
use crate::validate::parse_tracking_id;

/// Next free tracking id for `project_key`.
///
/// Archived and deleted issues count toward the highest suffix, not just
/// active ones. Counting only the active directory would reissue the id of
/// an archived issue, and recovering it would then collide with the new one.
///
/// # Errors
///
/// Returns an error if an issue directory cannot be listed.
pub fn next_id(store: &DocumentStore, project_key: &str) -> SyncResult<String> {
    let mut max = 0u64;
    for lifecycle in Lifecycle::ALL {
        for stem in store.issue_stems(lifecycle)? {
            if let Some((key, n)) = parse_tracking_id(&stem) {
                if key == project_key {
                    max = max.max(n);
                }
            }
        }
    }
    Ok(format!("{project_key}-{}", max + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueDocument;
    use crate::sync::suppress::WriteContext;
    use tempfile::TempDir;

    fn write(store: &DocumentStore, id: &str, lifecycle: Lifecycle) {
        let (key, _) = parse_tracking_id(id).unwrap();
        let doc = IssueDocument::new(id.into(), key.into(), "x".into());
        store.write_issue(&doc, lifecycle, &WriteContext::detached()).unwrap();
    }

    #[test]
    fn test_first_id() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        assert_eq!(next_id(&store, "ENG").unwrap(), "ENG-1");
    }

    #[test]
    fn test_uses_numeric_max_not_lexical() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        write(&store, "ENG-2", Lifecycle::Active);
        write(&store, "ENG-10", Lifecycle::Active);
        write(&store, "ENGX-50", Lifecycle::Active);

        assert_eq!(next_id(&store, "ENG").unwrap(), "ENG-11");
    }

    #[test]
    fn test_archived_and_deleted_ids_are_not_reused() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        write(&store, "ENG-1", Lifecycle::Active);
        write(&store, "ENG-4", Lifecycle::Archived);
        write(&store, "ENG-7", Lifecycle::Deleted);

        assert_eq!(next_id(&store, "ENG").unwrap(), "ENG-8");
    }

    #[test]
    fn test_monotonic_over_sequential_creates() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        let mut last = 0;
        for _ in 0..5 {
            let id = next_id(&store, "OPS").unwrap();
            let (_, n) = parse_tracking_id(&id).unwrap();
            assert!(n > last);
            last = n;
            write(&store, &id, Lifecycle::Active);
        }
        assert_eq!(last, 5);
    }
}
