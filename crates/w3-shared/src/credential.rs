//! Signed admin credentials.
//!
//! Admin status is a role claim, not a property of the device identity. The
//! admin authority (normally the document server) checks the admin account
//! name and password, then signs a short-lived credential bound to the
//! caller's own user id. Clients verify the credential against the
//! authority's public key every time they make an authorization decision.

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::constants::KDF_CONTEXT_ADMIN_PASSWORD;
use crate::error::CredentialError;
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialPayload {
    pub subject: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminCredential {
    pub payload: CredentialPayload,
    pub signature: Vec<u8>,
}

impl AdminCredential {
    /// Encode the credential as a base64url string, suitable for storage in
    /// the local ledger or an `Authorization` header.
    pub fn encode(&self) -> Result<String, CredentialError> {
        let bytes = bincode::serialize(self).map_err(|_| CredentialError::InvalidFormat)?;
        Ok(base64_url_encode(&bytes))
    }

    pub fn decode(code: &str) -> Result<Self, CredentialError> {
        let bytes = base64_url_decode(code)?;
        bincode::deserialize(&bytes).map_err(|_| CredentialError::InvalidFormat)
    }

    /// Verify expiry, subject binding and signature.
    pub fn verify(
        &self,
        authority_pubkey: &[u8; 32],
        subject: &UserId,
    ) -> Result<(), CredentialError> {
        if Utc::now() > self.payload.expires_at {
            return Err(CredentialError::Expired);
        }

        if &self.payload.subject != subject {
            return Err(CredentialError::SubjectMismatch);
        }

        let payload_bytes =
            bincode::serialize(&self.payload).map_err(|_| CredentialError::InvalidFormat)?;

        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| CredentialError::InvalidSignature)?;

        let verifying_key = VerifyingKey::from_bytes(authority_pubkey)
            .map_err(|_| CredentialError::InvalidKeyBytes)?;

        verifying_key
            .verify(&payload_bytes, &signature)
            .map_err(|_| CredentialError::InvalidSignature)
    }
}

/// Issues admin credentials after checking the admin account.
#[derive(Clone)]
pub struct AdminAuthority {
    signing_key: SigningKey,
    username: String,
    password_hash: [u8; 32],
    ttl: Duration,
}

impl AdminAuthority {
    pub fn new(
        signing_key: SigningKey,
        username: impl Into<String>,
        password_hash: [u8; 32],
        ttl: Duration,
    ) -> Self {
        Self {
            signing_key,
            username: username.into(),
            password_hash,
            ttl,
        }
    }

    /// Authority with a freshly generated signing key.
    pub fn generate(username: impl Into<String>, password: &str, ttl: Duration) -> Self {
        Self::new(
            SigningKey::generate(&mut OsRng),
            username,
            hash_password(password),
            ttl,
        )
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Check the admin account and, on success, issue a credential for
    /// `subject`. The subject's user id is never altered.
    pub fn login(
        &self,
        subject: &UserId,
        username: &str,
        password: &str,
    ) -> Result<AdminCredential, CredentialError> {
        if !ct_eq(username.as_bytes(), self.username.as_bytes()) {
            return Err(CredentialError::WrongUsername);
        }
        if !ct_eq(&hash_password(password), &self.password_hash) {
            return Err(CredentialError::WrongPassword);
        }
        self.issue(subject)
    }

    pub fn issue(&self, subject: &UserId) -> Result<AdminCredential, CredentialError> {
        let now = Utc::now();
        let payload = CredentialPayload {
            subject: subject.clone(),
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let payload_bytes =
            bincode::serialize(&payload).map_err(|_| CredentialError::InvalidFormat)?;
        let signature = self.signing_key.sign(&payload_bytes);

        Ok(AdminCredential {
            payload,
            signature: signature.to_bytes().to_vec(),
        })
    }
}

/// Derive the stored hash of an admin password (BLAKE3 keyed derivation).
pub fn hash_password(password: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_ADMIN_PASSWORD);
    hasher.update(password.as_bytes());
    *hasher.finalize().as_bytes()
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).unwrap_u8() == 1
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, CredentialError> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD
        .decode(s.trim())
        .map_err(|_| CredentialError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> AdminAuthority {
        AdminAuthority::generate("admin626", "secret", Duration::days(30))
    }

    #[test]
    fn test_login_issues_verifiable_credential() {
        let authority = authority();
        let me = UserId::from("user_1_abc");

        let credential = authority.login(&me, "admin626", "secret").unwrap();
        assert_eq!(credential.payload.subject, me);
        assert!(credential.verify(&authority.public_key(), &me).is_ok());
    }

    #[test]
    fn test_login_rejects_bad_account() {
        let authority = authority();
        let me = UserId::from("user_1_abc");

        assert_eq!(
            authority.login(&me, "root", "secret").unwrap_err(),
            CredentialError::WrongUsername
        );
        assert_eq!(
            authority.login(&me, "admin626", "nope").unwrap_err(),
            CredentialError::WrongPassword
        );
    }

    #[test]
    fn test_credential_bound_to_subject() {
        let authority = authority();
        let credential = authority.issue(&UserId::from("user_1_abc")).unwrap();

        assert_eq!(
            credential
                .verify(&authority.public_key(), &UserId::from("user_2_def"))
                .unwrap_err(),
            CredentialError::SubjectMismatch
        );
    }

    #[test]
    fn test_expired_credential_rejected() {
        let authority = AdminAuthority::generate("admin626", "secret", Duration::days(-1));
        let me = UserId::from("user_1_abc");
        let credential = authority.issue(&me).unwrap();

        assert_eq!(
            credential.verify(&authority.public_key(), &me).unwrap_err(),
            CredentialError::Expired
        );
    }

    #[test]
    fn test_tampered_or_foreign_credential_rejected() {
        let authority = authority();
        let other = self::authority();
        let me = UserId::from("user_1_abc");

        let mut credential = authority.issue(&me).unwrap();
        assert!(credential.verify(&other.public_key(), &me).is_err());

        credential.payload.expires_at = credential.payload.expires_at + Duration::days(365);
        assert_eq!(
            credential.verify(&authority.public_key(), &me).unwrap_err(),
            CredentialError::InvalidSignature
        );
    }

    #[test]
    fn test_encoding_survives_storage() {
        let authority = authority();
        let me = UserId::from("user_1_abc");
        let credential = authority.issue(&me).unwrap();

        let decoded = AdminCredential::decode(&credential.encode().unwrap()).unwrap();
        assert_eq!(decoded, credential);
        assert!(AdminCredential::decode("not base64!").is_err());
    }
}
