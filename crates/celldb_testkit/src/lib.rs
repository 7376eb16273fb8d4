//! Test utilities for celldb.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - Property-based test generators using proptest
//! - A backend-contract conformance suite
//!
//! ## Usage
//!
//! ```rust
//! use celldb_testkit::with_memory_store;
//!
//! with_memory_store(|store| {
//!     store.set("row:x", "metadata:a", b"1".to_vec()).unwrap();
//!     assert!(store.resolve("row:x", "metadata:a").unwrap().is_some());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod conformance;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::conformance::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use conformance::*;
pub use fixtures::*;
pub use generators::*;
