//! Declarative queries over the subject space.
//!
//! A [`Query`] pairs a candidate source (subject prefix or explicit
//! subject set) with a composable [`Filter`], an attribute projection
//! and a version window, and runs as a lazy [`Rows`] iterator via
//! [`crate::CellStore::query`].

mod engine;
mod filter;

pub use engine::{Query, Row, Rows};
pub use filter::{escape, Filter};
