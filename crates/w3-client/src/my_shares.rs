//! The "my shared diaries" view over the local share records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use w3_shared::{ShareMode, SharedId};

use crate::error::Result;
use crate::sharing::SharingService;
use crate::state::lock;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyShareSummary {
    pub article_id: i64,
    pub shared_id: SharedId,
    pub title: String,
    pub category: String,
    pub share_mode: ShareMode,
    pub comment_count: usize,
    pub shared_at: DateTime<Utc>,
}

impl SharingService {
    /// Summaries of this device's live shares, newest first.
    ///
    /// Records whose remote diary is gone are dropped from the ledger.
    /// Records that point at a diary created for another article are
    /// skipped but kept.
    pub async fn my_shares(&self) -> Result<Vec<MyShareSummary>> {
        let records = lock(&self.state().ledger).share_records()?;

        let mut summaries = Vec::new();
        for (article_key, shared_id) in records {
            let Some(diary) = self.fetch(&shared_id).await? else {
                debug!(shared_id = %shared_id, "share vanished remotely, forgetting it");
                self.forget(&shared_id);
                continue;
            };
            if diary.creator_id.to_string() != article_key {
                debug!(shared_id = %shared_id, article = %article_key, "share belongs to another article");
                continue;
            }
            summaries.push(MyShareSummary {
                article_id: diary.creator_id,
                shared_id,
                title: diary.article.title,
                category: diary.article.category,
                share_mode: diary.article.share_mode,
                comment_count: diary.comments.len(),
                shared_at: diary.article.shared_at,
            });
        }
        summaries.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
        Ok(summaries)
    }
}
