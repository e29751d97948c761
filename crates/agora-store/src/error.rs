use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot could not be encoded or decoded.
    #[error("Snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    /// A row with the same primary key already exists.
    #[error("Duplicate id in {table}: {id}")]
    Duplicate { table: &'static str, id: String },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
