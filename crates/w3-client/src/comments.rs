//! Live comment threads under shared diaries and announcements.
//!
//! Comment order is by the writer's clock, so the order across clients is
//! approximate; ties are broken by store key.

use std::collections::BTreeMap;

use chrono::Local;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use w3_shared::protocol::{paths, sort_comments, CommentEntry};
use w3_shared::types::now_millis;
use w3_shared::Comment;
use w3_sync::{DocEvent, DocPath, DocumentStore, DocumentStoreExt, Subscription, SyncError};

use crate::error::{required, Result, ShareError};
use crate::state::AppState;

/// Display format of comment dates.
const COMMENT_DATE_FORMAT: &str = "%Y/%-m/%-d %H:%M:%S";

#[derive(Clone)]
pub struct CommentStream {
    state: AppState,
}

impl CommentStream {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Watch the comments under `parent` (a diary or announcement path).
    ///
    /// The returned feed already holds the current comments.
    pub async fn subscribe(&self, parent: &str) -> Result<CommentFeed> {
        let path = DocPath::parse(&paths::comments(parent))?;
        let mut subscription = self.state.store.subscribe(&path).await?;

        let mut thread = Thread::default();
        thread.apply(subscription.recv().await?);
        let (tx, rx) = watch::channel(thread.sorted());

        let task = tokio::spawn(run_feed(subscription, thread, tx));
        Ok(CommentFeed { rx, task })
    }

    /// Append a comment as the current user. Returns the comment key.
    pub async fn post(&self, parent: &str, author: &str, content: &str) -> Result<String> {
        let content = required(content, "comment content")?;
        let author = required(author, "display name")?;
        let path = DocPath::parse(&paths::comments(parent))?;

        let comment = Comment {
            author,
            author_id: self.state.identity.user_id(),
            content,
            timestamp: now_millis(),
            date: Local::now().format(COMMENT_DATE_FORMAT).to_string(),
        };
        let key = self.state.store.push_as(&path, &comment).await?;
        debug!(parent, key = %key, "comment posted");
        Ok(key)
    }
}

async fn run_feed(
    mut subscription: Subscription,
    mut thread: Thread,
    tx: watch::Sender<Vec<CommentEntry>>,
) {
    while let Some(event) = subscription.next().await {
        thread.apply(event);
        if tx.send(thread.sorted()).is_err() {
            break;
        }
    }
    debug!(path = %subscription.path(), "comment feed stopped");
}

/// Comments keyed by store key.
#[derive(Default)]
struct Thread {
    comments: BTreeMap<String, Comment>,
}

impl Thread {
    fn apply(&mut self, event: DocEvent) {
        match event {
            DocEvent::Snapshot { value } => {
                self.comments.clear();
                if let Some(Value::Object(children)) = value {
                    for (key, value) in children {
                        self.put(key, value);
                    }
                }
            }
            DocEvent::ChildPut { key, value } => self.put(key, value),
            DocEvent::ChildRemoved { key } => {
                self.comments.remove(&key);
            }
        }
    }

    fn put(&mut self, key: String, value: Value) {
        match serde_json::from_value::<Comment>(value) {
            Ok(comment) => {
                self.comments.insert(key, comment);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed comment");
                self.comments.remove(&key);
            }
        }
    }

    fn sorted(&self) -> Vec<CommentEntry> {
        let mut entries: Vec<CommentEntry> = self
            .comments
            .iter()
            .map(|(id, comment)| CommentEntry {
                id: id.clone(),
                comment: comment.clone(),
            })
            .collect();
        sort_comments(&mut entries);
        entries
    }
}

/// A live, ordered view of one comment thread.
///
/// Dropping the feed stops its background task and detaches the store
/// listener.
pub struct CommentFeed {
    rx: watch::Receiver<Vec<CommentEntry>>,
    task: JoinHandle<()>,
}

impl CommentFeed {
    /// Comments as of now, in render order.
    pub fn current(&self) -> Vec<CommentEntry> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the full ordered list.
    pub async fn changed(&mut self) -> Result<Vec<CommentEntry>> {
        self.rx
            .changed()
            .await
            .map_err(|_| ShareError::Remote(SyncError::Closed))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    pub fn cancel(self) {}
}

impl Drop for CommentFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use w3_shared::ShareMode;
    use w3_store::journal::ArticleDraft;
    use w3_sync::MemoryDocumentStore;

    use super::*;
    use crate::testing::device;

    fn comment_json(ts: i64, text: &str) -> Value {
        json!({
            "author": "a",
            "authorId": "user_a",
            "content": text,
            "timestamp": ts,
            "date": "2025/1/1 00:00:00",
        })
    }

    #[test]
    fn out_of_order_delivery_renders_by_timestamp() {
        let mut thread = Thread::default();
        thread.apply(DocEvent::ChildPut { key: "k3".into(), value: comment_json(3, "three") });
        thread.apply(DocEvent::ChildPut { key: "k1".into(), value: comment_json(1, "one") });
        thread.apply(DocEvent::ChildPut { key: "k2".into(), value: comment_json(2, "two") });

        let order: Vec<i64> = thread.sorted().iter().map(|c| c.comment.timestamp).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn ties_break_by_key_and_snapshot_resets() {
        let mut thread = Thread::default();
        thread.apply(DocEvent::Snapshot {
            value: Some(json!({ "b": comment_json(5, "x"), "a": comment_json(5, "y") })),
        });
        let ids: Vec<String> = thread.sorted().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        thread.apply(DocEvent::ChildRemoved { key: "a".into() });
        assert_eq!(thread.sorted().len(), 1);
        thread.apply(DocEvent::Snapshot { value: None });
        assert!(thread.sorted().is_empty());
    }

    #[test]
    fn malformed_children_are_skipped() {
        let mut thread = Thread::default();
        thread.apply(DocEvent::ChildPut { key: "bad".into(), value: json!("oops") });
        assert!(thread.sorted().is_empty());
    }

    #[tokio::test]
    async fn post_validates_before_writing() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let comments = alice.comments();
        assert!(matches!(
            comments.post("shared_diaries/d", "Alice", "   ").await,
            Err(ShareError::Validation(_))
        ));
        assert!(matches!(
            comments.post("shared_diaries/d", "", "hi").await,
            Err(ShareError::Validation(_))
        ));
        assert_eq!(store.to_value(), Value::Null);
    }

    #[tokio::test]
    async fn share_join_comment_reaches_live_subscriber() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let bob = device(&store, None);

        let article = alice
            .journal()
            .create(&ArticleDraft::new("A", "学习", "hello"))
            .unwrap();
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Public)
            .await
            .unwrap();
        let parent = paths::shared_diary(&code);

        let mut feed = alice.comments().subscribe(&parent).await.unwrap();
        assert!(feed.current().is_empty());

        bob.sharing().join_share(code.as_str(), "Bob").await.unwrap();
        bob.comments().post(&parent, "Bob", "hi").await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), feed.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].comment.content, "hi");
        assert_eq!(seen[0].comment.author, "Bob");
        assert_eq!(seen[0].comment.author_id, bob.identity.user_id());
    }

    #[tokio::test]
    async fn dropping_feed_detaches_listener() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);

        let feed = alice.comments().subscribe("announcements/x").await.unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(feed);

        // The abort lands at the task's next poll.
        for _ in 0..100 {
            if store.listener_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.listener_count(), 0);
    }
}
