//! Referential integrity over the document tree.
//!
//! These checks read documents, not the index, and take no locks: a target
//! can disappear between validation and the caller's write.

use serde::Serialize;
use tracing::info;

use crate::model::{now, IssueDocument, Lifecycle};
use crate::sync::store::DocumentStore;
use crate::sync::suppress::WriteContext;
use crate::sync::types::SyncResult;

/// A link entry in `issue` that points at the searched id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub issue: String,
    pub link_type: String,
}

/// One message per link entry whose target has no document in any
/// lifecycle directory. Blank refs are ignored.
///
/// # Errors
///
/// Returns an error only for I/O failures while probing documents.
pub fn validate_links(store: &DocumentStore, doc: &IssueDocument) -> SyncResult<Vec<String>> {
    let mut errors = Vec::new();
    for link in &doc.links {
        let target = link.target.trim();
        if target.is_empty() {
            continue;
        }
        if !store.issue_exists(target)? {
            errors.push(format!("Referenced issue {target} does not exist"));
        }
    }
    Ok(errors)
}

/// Every `(issue, link_type)` whose links reference `tracking_id`, across all
/// lifecycle directories. The issue's own document is skipped.
///
/// # Errors
///
/// Returns an error if an issue directory cannot be listed.
pub fn find_references_to(store: &DocumentStore, tracking_id: &str) -> SyncResult<Vec<Reference>> {
    let mut refs = Vec::new();
    for (_, _, doc) in store.list_all_issues()? {
        if doc.tracking_id == tracking_id {
            continue;
        }
        for link in doc.links.iter().filter(|l| l.target == tracking_id) {
            refs.push(Reference {
                issue: doc.tracking_id.clone(),
                link_type: link.link_type.clone(),
            });
        }
    }
    Ok(refs)
}

/// Strip every link to `tracking_id` from other documents and rewrite them in
/// place with a fresh `updated_at`. Returns the rewritten documents with the
/// lifecycle directory each one lives in, so callers can resync them.
///
/// # Errors
///
/// Returns an error if a document cannot be read or rewritten.
pub fn remove_references_to(
    store: &DocumentStore,
    tracking_id: &str,
    ctx: &WriteContext,
) -> SyncResult<Vec<(IssueDocument, Lifecycle)>> {
    let mut rewritten = Vec::new();
    for (_, lifecycle, mut doc) in store.list_all_issues()? {
        if doc.tracking_id == tracking_id {
            continue;
        }
        if doc.strip_links_to(tracking_id) == 0 {
            continue;
        }
        doc.updated_at = Some(now());
        store.write_issue(&doc, lifecycle, ctx)?;
        info!(id = %doc.tracking_id, removed = tracking_id, "Removed dangling references");
        rewritten.push((doc, lifecycle));
    }
    Ok(rewritten)
}
