use thiserror::Error;

/// Errors produced by the ledger layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("Corrupt ledger entry: {0}")]
    Json(#[from] serde_json::Error),

    /// A lookup by id found nothing.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness rule was violated (e.g. two categories with one name).
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// The requested change is not allowed (e.g. deleting the sentinel category).
    #[error("Invalid operation: {0}")]
    Invalid(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
