//! Permission gate for shared content.
//!
//! Two tiers only: an admin may do anything, an owner may delete what they
//! authored. Every predicate is pure and must be re-evaluated per request.

use crate::error::PermissionError;
use crate::identity::Principal;
use crate::types::UserId;

/// Mutations of shared content that pass through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    DeleteDiary { author_id: &'a UserId },
    PublishAnnouncement,
    DeleteAnnouncement,
}

pub fn is_admin(principal: &Principal) -> bool {
    principal.is_admin()
}

pub fn is_owner(principal: &Principal, resource_author_id: &UserId) -> bool {
    &principal.user_id == resource_author_id
}

/// Admin or author of the resource.
pub fn can_delete(principal: &Principal, author_id: &UserId) -> bool {
    is_admin(principal) || is_owner(principal, author_id)
}

pub fn authorize(principal: &Principal, action: Action<'_>) -> Result<(), PermissionError> {
    match action {
        Action::DeleteDiary { author_id } => {
            if can_delete(principal, author_id) {
                Ok(())
            } else {
                Err(PermissionError::NotOwner)
            }
        }
        Action::PublishAnnouncement => {
            if is_admin(principal) {
                Ok(())
            } else {
                Err(PermissionError::PublishRequiresAdmin)
            }
        }
        Action::DeleteAnnouncement => {
            if is_admin(principal) {
                Ok(())
            } else {
                Err(PermissionError::DeleteRequiresAdmin)
            }
        }
    }
}
