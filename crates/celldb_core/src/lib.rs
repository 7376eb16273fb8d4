//! Versioned attribute store engine.
//!
//! `celldb_core` is a schemaless, multi-version cell space: values are
//! opaque bytes addressed by (subject, predicate, timestamp), stored
//! behind a pluggable [`celldb_backend::Backend`]. On top of the cell
//! space it layers per-subject exclusive [`Transaction`]s with
//! fail-fast locking, a bounded [`retry::RetryPolicy`] combinator, and
//! a composable [`query::Filter`]/[`query::Query`] engine.
//!
//! # Example
//!
//! ```rust
//! use celldb_core::{CellStore, Filter, Query};
//!
//! let store = CellStore::open_in_memory();
//! store.set("host/vfs/etc/passwd", "aff4:size", b"144".to_vec())?;
//!
//! let rows = store.query(
//!     Query::new(Filter::has_predicate("aff4:size")).prefix("host/"),
//! )?;
//! for row in rows {
//!     let row = row?;
//!     println!("{} -> {:?}", row.subject(), row.newest("aff4:size"));
//! }
//! # Ok::<(), celldb_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod config;
mod error;
pub mod query;
mod retry;
mod store;
mod transaction;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use query::{Filter, Query, Row, Rows};
pub use retry::RetryPolicy;
pub use store::{AttrWrite, CellStore, SetOptions};
pub use transaction::Transaction;
pub use types::{Cell, TimestampSelector};

pub use celldb_backend::Timestamp;
