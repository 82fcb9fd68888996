//! Client configuration loaded from environment variables.

use std::path::PathBuf;

use w3_shared::constants::DEFAULT_HTTP_PORT;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the document server.
    /// Env: `W3_SERVER_URL`
    /// Default: `http://127.0.0.1:8626`
    pub server_url: String,

    /// Ed25519 public key of the admin authority (hex, 64 chars).
    /// Env: `W3_ADMIN_PUBKEY`
    /// Default: none, fetched from the server on connect.
    pub admin_pubkey: Option<[u8; 32]>,

    /// Ledger file. `None` uses the platform data directory.
    /// Env: `W3_LEDGER_PATH`
    pub ledger_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"),
            admin_pubkey: None,
            ledger_path: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("W3_SERVER_URL") {
            if !url.trim().is_empty() {
                config.server_url = url.trim().to_string();
            }
        }

        if let Ok(hex_key) = std::env::var("W3_ADMIN_PUBKEY") {
            match parse_pubkey(&hex_key) {
                Some(key) => config.admin_pubkey = Some(key),
                None => tracing::warn!("Invalid W3_ADMIN_PUBKEY, ignoring"),
            }
        }

        if let Ok(path) = std::env::var("W3_LEDGER_PATH") {
            config.ledger_path = Some(PathBuf::from(path));
        }

        config
    }
}

pub(crate) fn parse_pubkey(hex_key: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(hex_key.trim()).ok()?;
    bytes.try_into().ok()
}
