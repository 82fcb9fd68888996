//! Raw access to the namespaced key/value table.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::error::Result;

/// Ledger keys. Kept identical to the browser storage keys so exported data
/// stays recognisable.
pub mod keys {
    pub const WEEKLY_PLAN: &str = "w3_warroom";
    pub const JOURNAL: &str = "w3_journal";
    pub const CATEGORIES: &str = "w3_journal_categories";
    pub const DISPLAY_NAME: &str = "w3_username";
    pub const USER_ID: &str = "w3_user_id";
    pub const SHARE_RECORDS: &str = "w3_shared_records";
    pub const ADMIN_CREDENTIAL: &str = "w3_admin_credential";
}

impl Database {
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        read_raw(self.conn(), key)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        write_raw(self.conn(), key, value)
    }

    /// Read and decode a JSON document. `None` when the key is absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        read_json(self.conn(), key)
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        write_json(self.conn(), key, value)
    }

    /// Delete a key.  Returns `true` if it existed.
    pub fn remove_key(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM ledger WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare("SELECT key FROM ledger ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

pub(crate) fn read_raw(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM ledger WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub(crate) fn write_raw(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    match read_raw(conn, key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub(crate) fn write_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    write_raw(conn, key, &raw)
}
