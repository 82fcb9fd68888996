//! Remote document store: a tree of JSON values addressed by slash
//! separated paths, with point reads, full-replace writes, keyed appends,
//! deletes and live subscriptions.
//!
//! [`MemoryDocumentStore`] is the authoritative tree (hosted by the server,
//! or used directly in tests). [`HttpDocumentStore`] talks to a hosted tree
//! over REST and server-sent events.

pub mod error;
pub mod event;
pub mod http;
pub mod memory;
pub mod path;
pub mod store;

pub use error::SyncError;
pub use event::DocEvent;
pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;
pub use path::DocPath;
pub use store::{DocumentStore, DocumentStoreExt, Subscription};
