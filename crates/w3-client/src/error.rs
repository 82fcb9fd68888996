use thiserror::Error;

use w3_shared::{CredentialError, PermissionError};
use w3_store::StoreError;
use w3_sync::SyncError;

/// Errors surfaced by the sharing subsystem.
///
/// Validation and permission failures are raised before any I/O happens.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Bad user input (empty name, empty comment, wrong admin account...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The remote record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(#[from] PermissionError),

    /// The remote document store could not be reached or answered an error.
    #[error("Remote store error: {0}")]
    Remote(#[from] SyncError),

    #[error("Local ledger error: {0}")]
    Ledger(#[from] StoreError),

    /// A stored or received admin credential is unusable.
    #[error("Credential error: {0}")]
    Credential(CredentialError),
}

impl From<CredentialError> for ShareError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::WrongUsername | CredentialError::WrongPassword => {
                ShareError::Validation(e.to_string())
            }
            other => ShareError::Credential(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShareError>;

pub(crate) fn required(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ShareError::Validation(format!("{what} is required")));
    }
    Ok(value.to_string())
}
