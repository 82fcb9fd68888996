use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{ID_SUFFIX_LEN, SHARE_CODE_PREFIX, USER_ID_PREFIX};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// Per-device user identifier. Opaque; compared only for equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a fresh `user_<millis>_<suffix>` identifier.
    pub fn generate() -> Self {
        Self(timestamped_id(USER_ID_PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Share code of a shared diary. Knowing it is enough to read the diary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SharedId(pub String);

impl SharedId {
    /// Generate a fresh `diary_<millis>_<suffix>` share code.
    ///
    /// Uniqueness is probabilistic: there is no server-side check.
    pub fn generate() -> Self {
        Self(timestamped_id(SHARE_CODE_PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl std::fmt::Display for SharedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a shared diary is advertised. `Private` ("friends") diaries stay out
/// of the plaza listing but remain readable by anyone holding the code.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    #[default]
    Public,
    #[serde(alias = "friends")]
    Private,
}

impl ShareMode {
    pub fn is_discoverable(&self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Milliseconds since the Unix epoch on the local clock.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Key for a child appended to a collection: 13 hex digits of the writer's
/// clock followed by 12 random hex digits.
pub fn push_key() -> String {
    let suffix: [u8; 6] = rand::thread_rng().gen();
    format!("{:013x}{}", now_millis().max(0), hex::encode(suffix))
}

fn timestamped_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{prefix}_{}_{suffix}", now_millis())
}
