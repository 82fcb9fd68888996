//! In-process document tree with realtime listeners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use w3_shared::types::push_key;

use crate::error::Result;
use crate::event::DocEvent;
use crate::path::DocPath;
use crate::store::{DocumentStore, Subscription};

struct Listener {
    path: DocPath,
    tx: mpsc::UnboundedSender<DocEvent>,
}

#[derive(Default)]
struct Tree {
    root: Value,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
}

/// The authoritative tree. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    tree: Arc<Mutex<Tree>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously exported tree.
    pub fn from_value(root: Value) -> Self {
        let store = Self::new();
        store.lock().root = prune(root);
        store
    }

    /// Copy of the whole tree.
    pub fn to_value(&self) -> Value {
        self.lock().root.clone()
    }

    /// Number of attached subscriptions.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        lock_tree(&self.tree)
    }

    fn write(&self, path: &DocPath, value: Value) -> bool {
        let mut tree = self.lock();
        let existed = value_at(&tree.root, path.segments()).is_some();
        let value = prune(value);
        if value.is_null() && !existed {
            return false;
        }
        write_at(&mut tree.root, path.segments(), value);
        tree.notify(path);
        existed
    }
}

fn lock_tree(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    // A panic while holding the lock leaves the tree consistent: every write
    // is a single in-place replace.
    tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Tree {
    /// Tell every listener affected by a write at `written` what changed.
    fn notify(&mut self, written: &DocPath) {
        let mut dead = Vec::new();
        for (id, listener) in &self.listeners {
            let event = if written.contains(&listener.path) {
                DocEvent::Snapshot {
                    value: value_at(&self.root, listener.path.segments()).cloned(),
                }
            } else if let Some(key) = listener.path.child_towards(written) {
                let mut child = listener.path.segments().to_vec();
                child.push(key.to_string());
                match value_at(&self.root, &child) {
                    Some(value) => DocEvent::ChildPut {
                        key: key.to_string(),
                        value: value.clone(),
                    },
                    None => DocEvent::ChildRemoved {
                        key: key.to_string(),
                    },
                }
            } else {
                continue;
            };

            if listener.tx.send(event).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            self.listeners.remove(&id);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>> {
        Ok(value_at(&self.lock().root, path.segments()).cloned())
    }

    async fn set(&self, path: &DocPath, value: Value) -> Result<()> {
        self.write(path, value);
        Ok(())
    }

    async fn push(&self, path: &DocPath, value: Value) -> Result<String> {
        let key = push_key();
        self.write(&path.child(&key)?, value);
        Ok(key)
    }

    async fn remove(&self, path: &DocPath) -> Result<bool> {
        Ok(self.write(path, Value::Null))
    }

    async fn subscribe(&self, path: &DocPath) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut tree = self.lock();
            let id = tree.next_listener;
            tree.next_listener += 1;

            // Snapshot and registration under one lock so no write slips
            // between them.
            let snapshot = value_at(&tree.root, path.segments()).cloned();
            let _ = tx.send(DocEvent::Snapshot { value: snapshot });
            tree.listeners.insert(
                id,
                Listener {
                    path: path.clone(),
                    tx,
                },
            );
            id
        };
        debug!(path = %path, id, "listener attached");

        let tree: Weak<Mutex<Tree>> = Arc::downgrade(&self.tree);
        Ok(Subscription::new(path.clone(), rx, move || {
            if let Some(tree) = tree.upgrade() {
                lock_tree(&tree).listeners.remove(&id);
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn value_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segments {
        node = node.as_object()?.get(seg)?;
    }
    (!is_vacant(node)).then_some(node)
}

fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    let child = map.entry(head.clone()).or_insert(Value::Null);
    write_at(child, rest, value);
    if is_vacant(child) {
        map.remove(head);
    }
}

/// Null and empty objects are "nothing stored".
fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drop null members and empty objects recursively.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !is_vacant(v))
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}
