use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Wrong admin username")]
    WrongUsername,

    #[error("Wrong admin password")]
    WrongPassword,

    #[error("Admin credential has expired")]
    Expired,

    #[error("Admin credential was issued to another user")]
    SubjectMismatch,

    #[error("Invalid credential signature")]
    InvalidSignature,

    #[error("Invalid credential format")]
    InvalidFormat,

    #[error("Invalid key bytes")]
    InvalidKeyBytes,
}

/// Rejection produced by the permission gate. Always raised before any
/// store mutation is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Only the author or an admin may delete this diary")]
    NotOwner,

    #[error("Only an admin may publish announcements")]
    PublishRequiresAdmin,

    #[error("Only an admin may delete announcements")]
    DeleteRequiresAdmin,
}
