//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use w3_shared::constants::{
    DEFAULT_ADMIN_TOKEN_TTL_DAYS, DEFAULT_ADMIN_USERNAME, DEFAULT_HTTP_PORT,
};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8626`
    pub http_addr: SocketAddr,

    /// Admin account name.
    /// Env: `ADMIN_USERNAME`
    /// Default: `admin626`
    pub admin_username: String,

    /// BLAKE3 hash of the admin password (hex, 64 chars), as produced by
    /// `w3_shared::credential::hash_password`.
    /// Env: `ADMIN_PASSWORD_HASH`
    /// Default: empty (admin login disabled).
    pub admin_password_hash: Option<[u8; 32]>,

    /// Ed25519 seed of the credential signing key (hex, 64 chars).
    /// Env: `ADMIN_SIGNING_KEY`
    /// Default: a fresh key per process, so credentials die with a restart.
    pub admin_signing_key: Option<[u8; 32]>,

    /// Lifetime of issued admin credentials.
    /// Env: `ADMIN_TOKEN_TTL_DAYS`
    /// Default: `30`
    pub admin_token_ttl_days: i64,

    /// JSON file the document tree is loaded from and saved to.
    /// Env: `SNAPSHOT_PATH`
    /// Default: none (tree lives in memory only).
    pub snapshot_path: Option<PathBuf>,

    /// Seconds between snapshot saves.
    /// Env: `SNAPSHOT_INTERVAL_SECS`
    /// Default: `30`
    pub snapshot_interval_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("admin_username", &self.admin_username)
            .field("admin_enabled", &self.admin_password_hash.is_some())
            .field("admin_signing_key", &self.admin_signing_key.map(|_| "<set>"))
            .field("admin_token_ttl_days", &self.admin_token_ttl_days)
            .field("snapshot_path", &self.snapshot_path)
            .field("snapshot_interval_secs", &self.snapshot_interval_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password_hash: None,
            admin_signing_key: None,
            admin_token_ttl_days: DEFAULT_ADMIN_TOKEN_TTL_DAYS,
            snapshot_path: None,
            snapshot_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(name) = std::env::var("ADMIN_USERNAME") {
            if !name.trim().is_empty() {
                config.admin_username = name.trim().to_string();
            }
        }

        if let Ok(hex_hash) = std::env::var("ADMIN_PASSWORD_HASH") {
            if !hex_hash.trim().is_empty() {
                match parse_hex_32(&hex_hash) {
                    Ok(hash) => config.admin_password_hash = Some(hash),
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid ADMIN_PASSWORD_HASH, admin login disabled")
                    }
                }
            }
        }

        if let Ok(hex_key) = std::env::var("ADMIN_SIGNING_KEY") {
            match parse_hex_32(&hex_key) {
                Ok(key) => config.admin_signing_key = Some(key),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid ADMIN_SIGNING_KEY, generating one")
                }
            }
        }

        if let Ok(val) = std::env::var("ADMIN_TOKEN_TTL_DAYS") {
            match val.parse::<i64>() {
                Ok(days) if days > 0 => config.admin_token_ttl_days = days,
                _ => tracing::warn!(value = %val, "Invalid ADMIN_TOKEN_TTL_DAYS, using default"),
            }
        }

        if let Ok(path) = std::env::var("SNAPSHOT_PATH") {
            if !path.is_empty() {
                config.snapshot_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(val) = std::env::var("SNAPSHOT_INTERVAL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.snapshot_interval_secs = secs.max(1);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a 64-character hex string into a 32-byte array.
pub fn parse_hex_32(value: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(value.trim()).map_err(|e| format!("invalid hex: {e}"))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))
}
