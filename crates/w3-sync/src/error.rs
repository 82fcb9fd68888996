use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Subscription closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SyncError>;
