//! # storage-adapters
//!
//! Content Store Adapter implementations for the forum core.
//!
//! - [`memory::InMemoryForumStore`] is always compiled.
//! - [`sqlite::SqliteForumStore`] requires the `db-sqlite` feature.

pub mod memory;
#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use memory::InMemoryForumStore;
#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteForumStore;
