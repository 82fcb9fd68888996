//! # w3-client
//!
//! The sharing subsystem as seen from one device: identity, sharing and
//! joining diaries, live comment threads, the plaza, the announcement board
//! and the private journal.
//!
//! Every service is built from an [`AppState`], which pairs the local
//! ledger with a remote [`w3_sync::DocumentStore`].

pub mod announcements;
pub mod comments;
pub mod config;
pub mod error;
pub mod identity;
pub mod journal;
pub mod my_shares;
pub mod plaza;
pub mod sharing;
pub mod state;

pub use announcements::{AnnouncementBoard, AnnouncementEntry};
pub use comments::{CommentFeed, CommentStream};
pub use config::ClientConfig;
pub use error::ShareError;
pub use identity::{AdminIssuer, HttpAdminIssuer, IdentityProvider};
pub use journal::JournalService;
pub use my_shares::MyShareSummary;
pub use plaza::{Plaza, PlazaCursor, PlazaEntry, PlazaPage, PlazaPages, PlazaQuery};
pub use sharing::{DeleteOutcome, SharingService};
pub use state::AppState;
