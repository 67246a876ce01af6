//! sm - a file-first project and issue tracker.
//!
//! Every project, issue and board is a hand-editable JSON document under a
//! data root. A SQLite index mirrors those documents for listing, filtering
//! and link traversal, and can be rebuilt from the tree at any time.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Document types (Project, Issue, Board)
//! - [`storage`] - SQLite index layer
//! - [`sync`] - Document store, reconciliation, rebuild and watch-sync
//! - [`tracker`] - Write paths over both stores, lifecycle transitions
//! - [`config`] - Data root, index path and actor resolution
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;
pub mod tracker;
pub mod validate;

pub use error::{Error, Result};
