//! # w3-shared
//!
//! Types shared by every W³ crate: identifiers and share codes, the records
//! exchanged through the realtime document store, the signed admin
//! credential, and the permission gate consulted before any mutation of
//! shared content.

pub mod constants;
pub mod credential;
pub mod error;
pub mod identity;
pub mod permission;
pub mod protocol;
pub mod types;

pub use credential::{AdminAuthority, AdminCredential};
pub use error::{CredentialError, PermissionError};
pub use identity::{Principal, Role};
pub use protocol::{Announcement, Comment, SharedArticle, SharedDiary};
pub use types::{ShareMode, SharedId, UserId};
