//! # w3-store
//!
//! The local ledger: durable, device-private storage for the weekly plan,
//! journal articles, categories, profile and share bookkeeping.
//!
//! Data lives in a single SQLite table of namespaced keys, each holding a
//! JSON document. The crate exposes a synchronous `Database` handle that
//! wraps a `rusqlite::Connection` and provides typed helpers per key.

pub mod backup;
pub mod categories;
pub mod database;
pub mod journal;
pub mod kv;
pub mod migrations;
pub mod models;
pub mod plan;
pub mod profile;

mod error;

pub use backup::{ExportBundle, ImportStats};
pub use database::Database;
pub use error::StoreError;
pub use models::*;
