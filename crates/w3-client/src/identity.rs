//! Identity provider: the per-device user id, the display name and the
//! admin role claim.

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use w3_shared::constants::ANONYMOUS_NAME;
use w3_shared::{AdminAuthority, AdminCredential, Principal, UserId};
use w3_store::Database;
use w3_sync::SyncError;

use crate::config::parse_pubkey;
use crate::error::{required, Result, ShareError};
use crate::state::lock;

/// Something that can check the admin account and issue a credential.
#[async_trait]
pub trait AdminIssuer: Send + Sync {
    async fn issue(&self, subject: &UserId, username: &str, password: &str)
        -> Result<AdminCredential>;
}

/// Issue credentials in-process, e.g. when the authority key is held locally.
#[async_trait]
impl AdminIssuer for AdminAuthority {
    async fn issue(
        &self,
        subject: &UserId,
        username: &str,
        password: &str,
    ) -> Result<AdminCredential> {
        Ok(self.login(subject, username, password)?)
    }
}

pub struct IdentityProvider {
    ledger: Arc<Mutex<Database>>,
    authority_key: Option<[u8; 32]>,
    user_id: OnceLock<UserId>,
}

impl IdentityProvider {
    pub fn new(ledger: Arc<Mutex<Database>>, authority_key: Option<[u8; 32]>) -> Self {
        Self {
            ledger,
            authority_key,
            user_id: OnceLock::new(),
        }
    }

    /// The device's user id, created on first use.
    ///
    /// Never fails: when the ledger cannot be read or written the id lives
    /// only in memory for this process.
    pub fn user_id(&self) -> UserId {
        self.user_id.get_or_init(|| self.load_or_create_user_id()).clone()
    }

    fn load_or_create_user_id(&self) -> UserId {
        let db = lock(&self.ledger);
        match db.user_id() {
            Ok(Some(id)) => return id,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not read user id, using an ephemeral one"),
        }

        let id = UserId::generate();
        if let Err(e) = db.set_user_id(&id) {
            warn!(error = %e, "could not persist user id");
        } else {
            info!(user_id = %id, "created user id");
        }
        id
    }

    /// Stored display name, or the anonymous placeholder.
    pub fn display_name(&self) -> String {
        match lock(&self.ledger).display_name() {
            Ok(Some(name)) => name,
            Ok(None) => ANONYMOUS_NAME.to_string(),
            Err(e) => {
                warn!(error = %e, "could not read display name");
                ANONYMOUS_NAME.to_string()
            }
        }
    }

    pub fn set_display_name(&self, name: &str) -> Result<String> {
        let name = required(name, "display name")?;
        lock(&self.ledger).set_display_name(&name)?;
        Ok(name)
    }

    /// Exchange the admin account for a credential bound to this device's
    /// user id, and keep it in the ledger.
    pub async fn login_admin(
        &self,
        issuer: &dyn AdminIssuer,
        username: &str,
        password: &str,
    ) -> Result<Principal> {
        let username = required(username, "admin username")?;
        if password.is_empty() {
            return Err(ShareError::Validation("admin password is required".into()));
        }

        let user_id = self.user_id();
        let credential = issuer.issue(&user_id, &username, password).await?;
        lock(&self.ledger).set_admin_credential(&credential.encode()?)?;

        let principal = self.principal();
        if principal.is_admin() {
            info!(user_id = %user_id, "admin login");
        } else {
            warn!(user_id = %user_id, "issued credential does not verify against the configured authority");
        }
        Ok(principal)
    }

    pub fn logout_admin(&self) -> Result<()> {
        lock(&self.ledger).clear_admin_credential()?;
        Ok(())
    }

    /// The current user and role. The stored credential is verified on every
    /// call, so expiry takes effect immediately.
    pub fn principal(&self) -> Principal {
        let user_id = self.user_id();
        let stored = match lock(&self.ledger).admin_credential() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "could not read admin credential");
                None
            }
        };
        let credential = stored.and_then(|code| AdminCredential::decode(&code).ok());
        Principal::resolve(user_id, credential.as_ref(), self.authority_key.as_ref())
    }

    pub fn is_admin(&self) -> bool {
        self.principal().is_admin()
    }

    /// Admin, or the author of the resource.
    pub fn can_delete(&self, author_id: &UserId) -> bool {
        w3_shared::permission::can_delete(&self.principal(), author_id)
    }
}

// ---------------------------------------------------------------------------
// Remote authority
// ---------------------------------------------------------------------------

/// Admin authority hosted by `w3-server`.
#[derive(Clone, Debug)]
pub struct HttpAdminIssuer {
    client: Client,
    base: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    user_id: &'a UserId,
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    credential: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubkeyReply {
    public_key: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

impl HttpAdminIssuer {
    pub fn new(base: &str) -> Result<Self> {
        let client = Client::builder().build().map_err(SyncError::from)?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// The authority's verifying key. `None` when the server has admin
    /// login disabled.
    pub async fn public_key(&self) -> Result<Option<[u8; 32]>> {
        let resp = self
            .client
            .get(format!("{}/admin/pubkey", self.base))
            .send()
            .await
            .map_err(SyncError::from)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        let reply: PubkeyReply = resp.json().await.map_err(SyncError::from)?;
        parse_pubkey(&reply.public_key)
            .map(Some)
            .ok_or(ShareError::Credential(w3_shared::CredentialError::InvalidKeyBytes))
    }
}

#[async_trait]
impl AdminIssuer for HttpAdminIssuer {
    async fn issue(
        &self,
        subject: &UserId,
        username: &str,
        password: &str,
    ) -> Result<AdminCredential> {
        let resp = self
            .client
            .post(format!("{}/admin/login", self.base))
            .json(&LoginRequest {
                user_id: subject,
                username,
                password,
            })
            .send()
            .await
            .map_err(SyncError::from)?;

        match resp.status() {
            status if status.is_success() => {
                let reply: LoginReply = resp.json().await.map_err(SyncError::from)?;
                Ok(AdminCredential::decode(&reply.credential)?)
            }
            StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                let message = resp
                    .json::<ErrorReply>()
                    .await
                    .map(|e| e.error)
                    .unwrap_or_else(|_| "admin login rejected".to_string());
                Err(ShareError::Validation(message))
            }
            _ => Err(status_error(resp).await),
        }
    }
}

async fn status_error(resp: reqwest::Response) -> ShareError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    ShareError::Remote(SyncError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn provider(authority: Option<&AdminAuthority>) -> IdentityProvider {
        let db = Database::open_in_memory().unwrap();
        IdentityProvider::new(
            Arc::new(Mutex::new(db)),
            authority.map(AdminAuthority::public_key),
        )
    }

    #[test]
    fn user_id_is_stable_and_persisted() {
        let p = provider(None);
        let id = p.user_id();
        assert!(id.as_str().starts_with("user_"));
        assert_eq!(p.user_id(), id);
        assert_eq!(lock(&p.ledger).user_id().unwrap(), Some(id));
    }

    #[test]
    fn display_name_defaults_and_validates() {
        let p = provider(None);
        assert_eq!(p.display_name(), "匿名用户");
        assert!(matches!(p.set_display_name("  "), Err(ShareError::Validation(_))));
        assert_eq!(p.set_display_name(" 小红 ").unwrap(), "小红");
        assert_eq!(p.display_name(), "小红");
    }

    #[tokio::test]
    async fn admin_login_keeps_user_id() {
        let authority = AdminAuthority::generate("admin626", "secret", Duration::days(1));
        let p = provider(Some(&authority));
        let before = p.user_id();
        assert!(!p.is_admin());

        let principal = p.login_admin(&authority, "admin626", "secret").await.unwrap();
        assert!(principal.is_admin());
        assert_eq!(principal.user_id, before);
        assert_eq!(p.user_id(), before);

        p.logout_admin().unwrap();
        assert!(!p.is_admin());
    }

    #[tokio::test]
    async fn wrong_account_is_a_validation_error() {
        let authority = AdminAuthority::generate("admin626", "secret", Duration::days(1));
        let p = provider(Some(&authority));

        let err = p.login_admin(&authority, "root", "secret").await.unwrap_err();
        assert!(matches!(err, ShareError::Validation(ref m) if m.contains("username")));
        let err = p.login_admin(&authority, "admin626", "nope").await.unwrap_err();
        assert!(matches!(err, ShareError::Validation(ref m) if m.contains("password")));
        assert!(!p.is_admin());
    }

    #[tokio::test]
    async fn foreign_authority_grants_nothing() {
        let trusted = AdminAuthority::generate("admin626", "secret", Duration::days(1));
        let rogue = AdminAuthority::generate("admin626", "secret", Duration::days(1));
        let p = provider(Some(&trusted));

        let principal = p.login_admin(&rogue, "admin626", "secret").await.unwrap();
        assert!(!principal.is_admin());
    }

    #[tokio::test]
    async fn expired_credential_is_ignored() {
        let authority = AdminAuthority::generate("admin626", "secret", Duration::seconds(-1));
        let p = provider(Some(&authority));
        let principal = p.login_admin(&authority, "admin626", "secret").await.unwrap();
        assert!(!principal.is_admin());
    }

    #[test]
    fn can_delete_own_only_unless_admin() {
        let p = provider(None);
        let me = p.user_id();
        assert!(p.can_delete(&me));
        assert!(!p.can_delete(&UserId::from("user_other")));
    }
}
