//! varsync - surgical value propagation between configuration files.
//!
//! Watches structured configuration files (JSON, YAML, TOML, dotenv)
//! and, on change, propagates selected values from source key-paths to
//! target key-paths in other files. Targets are rewritten surgically:
//! only the replaced scalar spans change, every other byte (comments,
//! whitespace, ordering, quoting) is preserved. JSON targets are the
//! documented exception and go through a full reformat.
//!
//! # Architecture
//!
//! - [`model`]: file formats, sync rules, sync events
//! - [`error`]: error types and Result aliases
//! - [`keypath`]: `a.b[3].c` key-path expressions
//! - [`tree`]: structural loading and key-path navigation
//! - [`rewrite`]: the format-aware surgical rewriter
//! - [`watcher`]: debouncing, batching, per-target locking, and the
//!   [`watcher::SyncEngine`] orchestrator
//! - [`sync`]: the foreground watch-mode service
//! - [`config`]: the persisted rules document
//!
//! # Example
//!
//! ```rust,ignore
//! use varsync::config;
//! use varsync::sync::SyncService;
//!
//! #[tokio::main]
//! async fn main() -> varsync::Result<()> {
//!     let document = config::load("varsync.json".as_ref())?;
//!     SyncService::new(&document).run().await
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod keypath;
pub mod model;
pub mod rewrite;
pub mod sync;
pub mod tree;
pub mod watcher;

pub use error::{Error, Result};
pub use keypath::KeyPath;
pub use model::{FileFormat, RulesFile, SyncEvent, SyncRule};
pub use tree::Value;
pub use watcher::{EngineConfig, SyncEngine};
