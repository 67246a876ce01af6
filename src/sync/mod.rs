//! Document tree and its synchronization with the index.
//!
//! The document tree under the data root is the source of truth; the SQLite
//! index is derived from it:
//!
//! - **Store**: atomic whole-document reads and writes per lifecycle directory
//! - **Integrity**: link validation and reference cleanup over documents
//! - **Reconcile**: idempotent upserts from documents into index rows, and
//!   the full rebuild
//! - **Watch**: background re-sync of files edited outside the tracker
//! - **Suppress**: the self-write ledger that keeps the watcher from echoing
//!   the tracker's own writes
//!
//! # Architecture
//!
//! Writes are file-first:
//! 1. Validate links against the tree
//! 2. Write the document (marking the write through a [`WriteContext`])
//! 3. Reconcile the document into the index
//!
//! A crash between 2 and 3 leaves the index stale until the watcher or
//! `sm repair` catches up.
//!
//! # Example
//!
//! ```ignore
//! use sm::sync::{full_rebuild, DocumentStore};
//!
//! let store = DocumentStore::new(data_dir);
//! let stats = full_rebuild(&mut storage, &store, "ada@example.com")?;
//! println!("{} issues indexed", stats.issues);
//! ```

mod check;
mod file;
mod hash;
mod ids;
mod integrity;
mod layout;
mod reconcile;
mod store;
mod suppress;
mod types;
mod watch;

// Re-export main types and functions
pub use check::check_consistency;
pub use file::{atomic_write, write_json};
pub use hash::{content_hash, file_hash};
pub use ids::next_id;
pub use integrity::{find_references_to, remove_references_to, validate_links, Reference};
pub use layout::Layout;
pub use reconcile::{full_rebuild, Reconciler};
pub use store::DocumentStore;
pub use suppress::{SelfWriteLedger, WriteContext};
pub use types::{
    ConsistencyReport, DanglingRef, DocumentKind, DocumentLocation, Misplaced, RebuildStats,
    StaleRow, SyncError, SyncResult,
};
pub use watch::{start as start_watch, Applied, ChangeApplier, WatchHandle};
