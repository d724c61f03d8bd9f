//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite table:
//! - students(id, nisn, name, class, major, score, status, notes, created_at, updated_at)
//!
//! Callers depend on the `StudentStore` trait; `SqliteStore` is the
//! only implementation.

pub mod schema;
pub mod sqlite;
pub mod store;

pub use sqlite::SqliteStore;
pub use store::{GroupField, GroupedCounts, ListQuery, Page, StudentStore, PAGE_SIZE};
