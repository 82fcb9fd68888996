//! # w3-server
//!
//! Hosts the realtime document tree that W³ clients share diaries, comments
//! and announcements through.
//!
//! This binary provides:
//! - **REST API** (axum) for point reads, writes, appends and deletes at
//!   arbitrary document paths
//! - **Server-sent events** streaming keyed changes to subscribers
//! - **Admin authority** issuing signed, expiring admin credentials
//! - **JSON snapshots** of the tree so data survives restarts

mod api;
mod config;
mod error;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use w3_shared::AdminAuthority;
use w3_sync::MemoryDocumentStore;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,w3_server=debug")),
        )
        .init();

    info!("Starting W3 document server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let authority = build_authority(&config).map(Arc::new);
    match &authority {
        Some(a) => info!(
            username = %config.admin_username,
            pubkey = %hex::encode(a.public_key()),
            "Admin login enabled"
        ),
        None => info!("Admin login disabled (no ADMIN_PASSWORD_HASH)"),
    }

    let docs = match &config.snapshot_path {
        Some(path) => snapshot::load(path).await?,
        None => MemoryDocumentStore::new(),
    };

    let app_state = AppState {
        docs: docs.clone(),
        authority,
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    let saver = config.snapshot_path.clone().map(|path| {
        snapshot::spawn_saver(
            docs.clone(),
            path,
            Duration::from_secs(config.snapshot_interval_secs),
        )
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    if let Some(saver) = saver {
        saver.abort();
    }
    if let Some(path) = &config.snapshot_path {
        snapshot::save(&docs, path).await?;
        info!(path = %path.display(), "Final snapshot written");
    }

    Ok(())
}

fn build_authority(config: &ServerConfig) -> Option<AdminAuthority> {
    let password_hash = config.admin_password_hash?;

    let signing_key = match config.admin_signing_key {
        Some(seed) => SigningKey::from_bytes(&seed),
        None => {
            warn!("No ADMIN_SIGNING_KEY set; issued credentials will not survive a restart");
            SigningKey::generate(&mut rand::rngs::OsRng)
        }
    };

    Some(AdminAuthority::new(
        signing_key,
        config.admin_username.clone(),
        password_hash,
        chrono::Duration::days(config.admin_token_ttl_days),
    ))
}
