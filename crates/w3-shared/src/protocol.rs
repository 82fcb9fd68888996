use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ANNOUNCEMENTS_ROOT, COMMENTS_CHILD, SHARED_DIARIES_ROOT};
use crate::types::{ShareMode, SharedId, UserId};

/// Frozen copy of a journal article taken at share time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedArticle {
    /// Id of the source article in the author's local ledger
    pub id: i64,
    pub title: String,
    pub category: String,
    pub content: String,
    /// Display date of the source article
    pub date: String,
    /// Display name of the author at share time
    pub author: String,
    /// Identity id of the author; the ownership reference for deletes
    pub author_id: UserId,
    pub shared_at: DateTime<Utc>,
    #[serde(default)]
    pub share_mode: ShareMode,
}

/// Record stored at `shared_diaries/<sharedId>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedDiary {
    pub article: SharedArticle,
    /// Local article id on the originating device (bookkeeping, not auth)
    pub creator_id: i64,
    #[serde(default)]
    pub comments: BTreeMap<String, Comment>,
}

/// A comment under a shared diary or an announcement. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: String,
    pub author_id: UserId,
    pub content: String,
    /// Writer's clock in epoch milliseconds; there is no server time authority
    pub timestamp: i64,
    /// Pre-formatted display date
    pub date: String,
}

/// A comment together with its store key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentEntry {
    pub id: String,
    #[serde(flatten)]
    pub comment: Comment,
}

impl CommentEntry {
    /// Render order: ascending timestamp, ties broken by key.
    pub fn sort_key(&self) -> (i64, &str) {
        (self.comment.timestamp, self.id.as_str())
    }
}

/// Sort comments into render order regardless of delivery order.
pub fn sort_comments(entries: &mut [CommentEntry]) {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Admin broadcast stored at `announcements/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: BTreeMap<String, Comment>,
}

/// Document store paths used by the sharing subsystem.
pub mod paths {
    use super::*;

    pub fn shared_diaries() -> String {
        SHARED_DIARIES_ROOT.to_string()
    }

    pub fn shared_diary(id: &SharedId) -> String {
        format!("{SHARED_DIARIES_ROOT}/{id}")
    }

    pub fn announcements() -> String {
        ANNOUNCEMENTS_ROOT.to_string()
    }

    pub fn announcement(id: &str) -> String {
        format!("{ANNOUNCEMENTS_ROOT}/{id}")
    }

    /// Comment collection under a diary or announcement path.
    pub fn comments(parent: &str) -> String {
        format!("{}/{COMMENTS_CHILD}", parent.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, timestamp: i64) -> CommentEntry {
        CommentEntry {
            id: id.to_string(),
            comment: Comment {
                author: "a".into(),
                author_id: UserId::from("user_1_a"),
                content: format!("c{timestamp}"),
                timestamp,
                date: String::new(),
            },
        }
    }

    #[test]
    fn test_sort_is_independent_of_delivery_order() {
        let mut entries = vec![entry("k3", 3), entry("k1", 1), entry("k2", 2)];
        sort_comments(&mut entries);
        let order: Vec<i64> = entries.iter().map(|e| e.comment.timestamp).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_diary_wire_shape() {
        let json = serde_json::json!({
            "article": {
                "id": 17,
                "title": "A",
                "category": "学习",
                "content": "hello",
                "date": "2025/1/2",
                "author": "me",
                "authorId": "user_1_a",
                "sharedAt": "2025-01-02T03:04:05Z",
                "shareMode": "public"
            },
            "creatorId": 17
        });
        let diary: SharedDiary = serde_json::from_value(json).unwrap();
        assert_eq!(diary.article.author_id.as_str(), "user_1_a");
        assert!(diary.comments.is_empty());

        let back = serde_json::to_value(&diary).unwrap();
        assert_eq!(back["article"]["shareMode"], "public");
        assert_eq!(back["creatorId"], 17);
    }

    #[test]
    fn test_paths() {
        let id = SharedId::from("diary_1_x");
        assert_eq!(paths::shared_diary(&id), "shared_diaries/diary_1_x");
        assert_eq!(
            paths::comments(&paths::shared_diary(&id)),
            "shared_diaries/diary_1_x/comments"
        );
        assert_eq!(paths::comments("announcements/k/"), "announcements/k/comments");
    }
}
