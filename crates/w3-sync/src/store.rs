use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Result, SyncError};
use crate::event::DocEvent;
use crate::path::DocPath;

/// Operations every document store backend supports.
///
/// Writes are last-write-wins. `set` with `Value::Null` is a delete.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. `None` when nothing is stored at `path`.
    async fn get(&self, path: &DocPath) -> Result<Option<Value>>;

    /// Replace whatever is stored at `path`.
    async fn set(&self, path: &DocPath, value: Value) -> Result<()>;

    /// Store `value` under a fresh time-ordered key below `path` and return
    /// the key.
    async fn push(&self, path: &DocPath, value: Value) -> Result<String>;

    /// Delete `path` and everything below it. Returns whether anything was
    /// there; deleting a missing path is not an error.
    async fn remove(&self, path: &DocPath) -> Result<bool>;

    /// Start watching `path`. The first event is always a snapshot.
    async fn subscribe(&self, path: &DocPath) -> Result<Subscription>;
}

/// Typed helpers over any [`DocumentStore`].
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    async fn get_as<T>(&self, path: &DocPath) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(path).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_as<T>(&self, path: &DocPath, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.set(path, value).await
    }

    async fn push_as<T>(&self, path: &DocPath, value: &T) -> Result<String>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.push(path, value).await
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

/// A live view of one path.
///
/// Dropping the subscription detaches it from the store.
pub struct Subscription {
    path: DocPath,
    events: mpsc::UnboundedReceiver<DocEvent>,
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        path: DocPath,
        events: mpsc::UnboundedReceiver<DocEvent>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            path,
            events,
            detach: Some(Box::new(detach)),
        }
    }

    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Wait for the next event. `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<DocEvent> {
        self.events.recv().await
    }

    /// Like [`next`](Self::next) but reports closure as an error.
    pub async fn recv(&mut self) -> Result<DocEvent> {
        self.events.recv().await.ok_or(SyncError::Closed)
    }

    /// An already delivered event, without waiting.
    pub fn try_next(&mut self) -> Option<DocEvent> {
        self.events.try_recv().ok()
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
        tracing::trace!(path = %self.path, "subscription detached");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("path", &self.path).finish()
    }
}
