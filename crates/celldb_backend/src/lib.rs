//! # celldb Backend
//!
//! Storage backend trait and implementations for celldb.
//!
//! This crate provides the lowest-level abstraction of the store: a
//! multi-version cell space addressed by (subject, predicate,
//! timestamp). Backends persist cells and enumerate subjects; they
//! know nothing about transactions, filters, or queries.
//!
//! ## Design Principles
//!
//! - Backends store cells, not semantics: replace/version behavior is
//!   expressed by the batch they are handed
//! - Per-subject batches apply atomically
//! - Must be `Send + Sync` for concurrent access
//! - The core crate owns all interpretation above the cell level
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - CBOR-snapshot persistence with advisory locking

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod types;

pub use backend::Backend;
pub use error::{BackendError, BackendResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use types::{BatchOp, CellWrite, SubjectData, Timestamp, VersionMap, WriteBatch};
