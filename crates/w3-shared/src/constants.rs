/// Application name
pub const APP_NAME: &str = "W³";

/// Version string written into export bundles
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Root collection holding every shared diary
pub const SHARED_DIARIES_ROOT: &str = "shared_diaries";

/// Root collection holding admin announcements
pub const ANNOUNCEMENTS_ROOT: &str = "announcements";

/// Child collection name for comments under a diary or announcement
pub const COMMENTS_CHILD: &str = "comments";

/// Prefix of generated share codes (`diary_<millis>_<suffix>`)
pub const SHARE_CODE_PREFIX: &str = "diary";

/// Prefix of generated per-device user ids (`user_<millis>_<suffix>`)
pub const USER_ID_PREFIX: &str = "user";

/// Length of the base36 random suffix in generated ids
pub const ID_SUFFIX_LEN: usize = 9;

/// Display name used when the user never set one
pub const ANONYMOUS_NAME: &str = "匿名用户";

/// Name of the sentinel category that absorbs articles of deleted categories
pub const UNCATEGORIZED_NAME: &str = "未分类";

/// Id of the sentinel category
pub const UNCATEGORIZED_ID: &str = "uncategorized";

/// Default admin account name
pub const DEFAULT_ADMIN_USERNAME: &str = "admin626";

/// Default lifetime of an issued admin credential in days
pub const DEFAULT_ADMIN_TOKEN_TTL_DAYS: i64 = 30;

/// Key derivation context for the admin password hash (BLAKE3)
pub const KDF_CONTEXT_ADMIN_PASSWORD: &str = "w3-admin-password-v1";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8626;
