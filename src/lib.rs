//! # Gradcheck - Graduation Record Manager
//!
//! Public pass/fail lookup and aggregate statistics over a single
//! table of student records.
//!
//! Gradcheck provides:
//! - Typed student records with write-time invariant checks
//! - SQLite-backed storage behind the `StudentStore` interface
//! - Lookup by NISN and grouped graduation statistics
//! - An HTTP surface for the public pages and staff CRUD

pub mod student;
pub mod storage;
pub mod query;
pub mod server;
pub mod config;
pub mod output;
pub mod ui;


// Re-exports for convenient access
pub use student::{Field, Status, StudentInput, StudentRecord};
pub use storage::{SqliteStore, StudentStore};
pub use query::{LookupService, StatsService};

/// Result type alias for Gradcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Gradcheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{field}: {message}")]
    ConstraintViolation { field: Field, message: String },

    #[error("Student record not found: {0}")]
    RecordNotFound(i64),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn constraint(field: Field, message: impl Into<String>) -> Self {
        Error::ConstraintViolation {
            field,
            message: message.into(),
        }
    }
}
