//! Handles shared by every client service.

use std::sync::{Arc, Mutex, MutexGuard};

use w3_store::Database;
use w3_sync::{DocumentStore, HttpDocumentStore};

use crate::announcements::AnnouncementBoard;
use crate::comments::CommentStream;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::identity::{HttpAdminIssuer, IdentityProvider};
use crate::journal::JournalService;
use crate::plaza::Plaza;
use crate::sharing::SharingService;

/// Central client state. Cheap to clone.
///
/// The ledger is synchronous and sits behind a std mutex; guards are never
/// held across an `.await`.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Database>>,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<IdentityProvider>,
}

impl AppState {
    pub fn new(
        ledger: Database,
        store: Arc<dyn DocumentStore>,
        admin_pubkey: Option<[u8; 32]>,
    ) -> Self {
        let ledger = Arc::new(Mutex::new(ledger));
        let identity = Arc::new(IdentityProvider::new(ledger.clone(), admin_pubkey));
        Self {
            ledger,
            store,
            identity,
        }
    }

    /// Open the ledger and connect to the configured server. When no admin
    /// key is configured it is fetched from the server; if that fails the
    /// client runs without admin support.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let ledger = match &config.ledger_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        let store = Arc::new(HttpDocumentStore::new(&config.server_url)?);

        let admin_pubkey = match config.admin_pubkey {
            Some(key) => Some(key),
            None => match HttpAdminIssuer::new(&config.server_url)?.public_key().await {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(error = %e, "could not fetch admin public key");
                    None
                }
            },
        };

        tracing::info!(
            server = %config.server_url,
            admin_key = admin_pubkey.is_some(),
            "client connected"
        );
        Ok(Self::new(ledger, store, admin_pubkey))
    }

    pub fn sharing(&self) -> SharingService {
        SharingService::new(self.clone())
    }

    pub fn comments(&self) -> CommentStream {
        CommentStream::new(self.clone())
    }

    pub fn plaza(&self) -> Plaza {
        Plaza::new(self.clone())
    }

    pub fn announcements(&self) -> AnnouncementBoard {
        AnnouncementBoard::new(self.clone())
    }

    pub fn journal(&self) -> JournalService {
        JournalService::new(self.ledger.clone())
    }
}

/// Lock the ledger. A poisoned lock is recovered: every ledger write is a
/// single statement or transaction.
pub(crate) fn lock(ledger: &Mutex<Database>) -> MutexGuard<'_, Database> {
    ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
