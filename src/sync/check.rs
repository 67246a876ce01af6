//! Consistency check between document locations, document contents and
//! the index.
//!
//! An issue's lifecycle directory is a function of its status. Anything that
//! breaks that rule, or an index row that disagrees with the tree, is reported
//! here rather than silently corrected.

use std::collections::{BTreeMap, HashSet};

use crate::error::Result;
use crate::model::{IssueStatus, Lifecycle};
use crate::storage::SqliteStorage;
use crate::sync::store::DocumentStore;
use crate::sync::types::{ConsistencyReport, DanglingRef, Misplaced, StaleRow};

/// Scan the document tree and compare it with the index.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed or the index query fails.
pub fn check_consistency(storage: &SqliteStorage, store: &DocumentStore) -> Result<ConsistencyReport> {
    let layout = store.layout();
    let mut report = ConsistencyReport::default();

    // Where each tracking id has a file, parsed or not
    let mut on_disk: BTreeMap<String, Vec<Lifecycle>> = BTreeMap::new();
    for lifecycle in Lifecycle::ALL {
        for stem in store.issue_stems(lifecycle)? {
            on_disk.entry(stem).or_default().push(lifecycle);
        }
    }
    report.duplicates = on_disk
        .iter()
        .filter(|(_, places)| places.len() > 1)
        .map(|(id, _)| id.clone())
        .collect();

    let mut parsed: HashSet<(String, Lifecycle)> = HashSet::new();
    for (_, lifecycle, doc) in store.list_all_issues()? {
        report.documents_scanned += 1;
        let expected = doc.expected_lifecycle();
        if expected != lifecycle {
            report.misplaced.push(Misplaced {
                tracking_id: doc.tracking_id.clone(),
                status: doc.status.as_str().to_string(),
                found_in: lifecycle,
                expected,
            });
        }
        for link in &doc.links {
            let target = link.target.trim();
            if !target.is_empty() && !on_disk.contains_key(target) {
                report.dangling.push(DanglingRef {
                    issue: doc.tracking_id.clone(),
                    link_type: link.link_type.clone(),
                    target: target.to_string(),
                });
            }
        }
        parsed.insert((doc.tracking_id, lifecycle));
    }

    for (id, places) in &on_disk {
        for lifecycle in places {
            if !parsed.contains(&(id.clone(), *lifecycle)) {
                report
                    .unreadable
                    .push(layout.relative(&layout.issue_file(id, *lifecycle)));
            }
        }
    }

    for (tracking_id, status, file_path) in storage.issue_locations()? {
        let reason = match status.parse::<IssueStatus>() {
            Ok(parsed_status) => {
                let expected = layout.relative(&layout.issue_file(&tracking_id, parsed_status.lifecycle()));
                match on_disk.get(&tracking_id) {
                    None => Some("document no longer exists".to_string()),
                    Some(_) if file_path != expected => {
                        Some(format!("status {status} belongs in {expected}"))
                    }
                    Some(places) if !places.contains(&parsed_status.lifecycle()) => {
                        Some(format!("document is not at {expected}"))
                    }
                    Some(_) => None,
                }
            }
            Err(_) => Some(format!("unknown status {status}")),
        };
        if let Some(reason) = reason {
            report.stale.push(StaleRow {
                tracking_id,
                status,
                file_path,
                reason,
            });
        }
    }

    Ok(report)
}
