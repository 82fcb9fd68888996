//! Device profile: identity, display name, admin credential and the record
//! of which local articles were shared under which code.

use std::collections::BTreeMap;

use w3_shared::{SharedId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::kv::{self, keys};

/// `articleId -> sharedId`. Article ids are stored as strings, the way the
/// JSON object keys come out.
pub type ShareRecords = BTreeMap<String, SharedId>;

impl Database {
    pub fn user_id(&self) -> Result<Option<UserId>> {
        Ok(kv::read_raw(self.conn(), keys::USER_ID)?.map(UserId))
    }

    pub fn set_user_id(&self, id: &UserId) -> Result<()> {
        kv::write_raw(self.conn(), keys::USER_ID, id.as_str())
    }

    pub fn display_name(&self) -> Result<Option<String>> {
        Ok(kv::read_raw(self.conn(), keys::DISPLAY_NAME)?.filter(|n| !n.trim().is_empty()))
    }

    pub fn set_display_name(&self, name: &str) -> Result<()> {
        kv::write_raw(self.conn(), keys::DISPLAY_NAME, name)
    }

    /// Encoded admin credential, if one was stored.
    pub fn admin_credential(&self) -> Result<Option<String>> {
        kv::read_raw(self.conn(), keys::ADMIN_CREDENTIAL)
    }

    pub fn set_admin_credential(&self, encoded: &str) -> Result<()> {
        kv::write_raw(self.conn(), keys::ADMIN_CREDENTIAL, encoded)
    }

    pub fn clear_admin_credential(&self) -> Result<bool> {
        self.remove_key(keys::ADMIN_CREDENTIAL)
    }

    // ------------------------------------------------------------------
    // Share records
    // ------------------------------------------------------------------

    pub fn share_records(&self) -> Result<ShareRecords> {
        Ok(kv::read_json(self.conn(), keys::SHARE_RECORDS)?.unwrap_or_default())
    }

    pub fn share_for_article(&self, article_id: i64) -> Result<Option<SharedId>> {
        Ok(self.share_records()?.remove(&article_id.to_string()))
    }

    pub fn record_share(&self, article_id: i64, shared_id: &SharedId) -> Result<()> {
        let mut records = self.share_records()?;
        records.insert(article_id.to_string(), shared_id.clone());
        kv::write_json(self.conn(), keys::SHARE_RECORDS, &records)
    }

    /// Drop every mapping that points at `shared_id`. Returns how many went.
    pub fn forget_share(&self, shared_id: &SharedId) -> Result<usize> {
        let mut records = self.share_records()?;
        let before = records.len();
        records.retain(|_, v| v != shared_id);
        let removed = before - records.len();
        if removed > 0 {
            kv::write_json(self.conn(), keys::SHARE_RECORDS, &records)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_fields() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.user_id().unwrap().is_none());
        assert!(db.display_name().unwrap().is_none());

        let id = UserId::generate();
        db.set_user_id(&id).unwrap();
        db.set_display_name("小明").unwrap();
        assert_eq!(db.user_id().unwrap(), Some(id));
        assert_eq!(db.display_name().unwrap().as_deref(), Some("小明"));
    }

    #[test]
    fn credential_can_be_cleared() {
        let db = Database::open_in_memory().unwrap();
        db.set_admin_credential("token").unwrap();
        assert_eq!(db.admin_credential().unwrap().as_deref(), Some("token"));
        assert!(db.clear_admin_credential().unwrap());
        assert!(db.admin_credential().unwrap().is_none());
    }

    #[test]
    fn share_records_map_and_forget() {
        let db = Database::open_in_memory().unwrap();
        let code = SharedId::generate();
        db.record_share(1, &code).unwrap();
        db.record_share(2, &code).unwrap();
        db.record_share(3, &SharedId::generate()).unwrap();

        assert_eq!(db.share_for_article(1).unwrap(), Some(code.clone()));
        assert_eq!(db.forget_share(&code).unwrap(), 2);
        assert_eq!(db.forget_share(&code).unwrap(), 0);
        assert_eq!(db.share_records().unwrap().len(), 1);
    }
}
