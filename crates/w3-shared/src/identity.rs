use serde::{Deserialize, Serialize};

use crate::credential::AdminCredential;
use crate::types::UserId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

/// The acting user as seen by the permission gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn member(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Member,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Resolve the role of `user_id` from an optional stored credential.
    ///
    /// A credential that fails verification for any reason (expired, issued
    /// to another id, signed by another authority) yields a plain member.
    pub fn resolve(
        user_id: UserId,
        credential: Option<&AdminCredential>,
        authority_pubkey: Option<&[u8; 32]>,
    ) -> Self {
        let role = match (credential, authority_pubkey) {
            (Some(credential), Some(pubkey)) if credential.verify(pubkey, &user_id).is_ok() => {
                Role::Admin
            }
            _ => Role::Member,
        };
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::credential::AdminAuthority;

    #[test]
    fn test_resolve_roles() {
        let authority = AdminAuthority::generate("admin626", "pw", Duration::days(1));
        let me = UserId::from("user_1_me");
        let credential = authority.issue(&me).unwrap();
        let pubkey = authority.public_key();

        assert!(Principal::resolve(me.clone(), Some(&credential), Some(&pubkey)).is_admin());
        assert!(!Principal::resolve(me.clone(), None, Some(&pubkey)).is_admin());
        assert!(!Principal::resolve(me.clone(), Some(&credential), None).is_admin());

        let stranger = UserId::from("user_2_other");
        assert!(!Principal::resolve(stranger, Some(&credential), Some(&pubkey)).is_admin());
    }
}
