//! Admin-authored announcements.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use w3_shared::permission::{authorize, Action};
use w3_shared::protocol::paths;
use w3_shared::Announcement;
use w3_sync::{DocPath, DocumentStore, DocumentStoreExt};

use crate::comments::{CommentFeed, CommentStream};
use crate::error::{required, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementEntry {
    pub id: String,
    pub announcement: Announcement,
    pub comment_count: usize,
}

#[derive(Clone)]
pub struct AnnouncementBoard {
    state: AppState,
}

impl AnnouncementBoard {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Every announcement, newest first.
    pub async fn list(&self) -> Result<Vec<AnnouncementEntry>> {
        let root = DocPath::parse(&paths::announcements())?;
        let mut entries: Vec<AnnouncementEntry> = match self.state.store.get(&root).await? {
            Some(Value::Object(children)) => children
                .into_iter()
                .filter_map(|(id, value)| match serde_json::from_value::<Announcement>(value) {
                    Ok(announcement) => Some(AnnouncementEntry {
                        id,
                        comment_count: announcement.comments.len(),
                        announcement,
                    }),
                    Err(e) => {
                        debug!(id = %id, error = %e, "skipping malformed announcement");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        entries.sort_by(|a, b| {
            (b.announcement.created_at, &b.id).cmp(&(a.announcement.created_at, &a.id))
        });
        Ok(entries)
    }

    /// Publish as the current admin. Returns the announcement id.
    pub async fn publish(&self, title: &str, content: &str) -> Result<String> {
        let title = required(title, "announcement title")?;
        let content = required(content, "announcement content")?;

        let principal = self.state.identity.principal();
        authorize(&principal, Action::PublishAnnouncement)?;

        let announcement = Announcement {
            title,
            content,
            author: self.state.identity.display_name(),
            author_id: principal.user_id.clone(),
            created_at: Utc::now(),
            comments: BTreeMap::new(),
        };
        let root = DocPath::parse(&paths::announcements())?;
        let id = self.state.store.push_as(&root, &announcement).await?;

        info!(id = %id, by = %principal.user_id, "announcement published");
        Ok(id)
    }

    /// Remove an announcement and its comments. Deleting a missing one
    /// succeeds with `false`.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let principal = self.state.identity.principal();
        authorize(&principal, Action::DeleteAnnouncement)?;

        let path = DocPath::parse(&paths::announcement(id))?;
        let existed = self.state.store.remove(&path).await?;
        info!(id, existed, "announcement deleted");
        Ok(existed)
    }

    pub async fn comments(&self, id: &str) -> Result<CommentFeed> {
        CommentStream::new(self.state.clone())
            .subscribe(&paths::announcement(id))
            .await
    }

    pub async fn comment(&self, id: &str, author: &str, content: &str) -> Result<String> {
        CommentStream::new(self.state.clone())
            .post(&paths::announcement(id), author, content)
            .await
    }
}
