//! The plaza: the public directory of shared diaries.
//!
//! Every listing reads the whole `shared_diaries` collection and filters and
//! orders it locally, so a load costs time linear in the total number of
//! shares. Paging is a cursor over that ordering, not a server query.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use w3_shared::permission::{can_delete, is_owner};
use w3_shared::protocol::paths;
use w3_shared::{Principal, SharedArticle, SharedDiary, SharedId};
use w3_sync::{DocPath, DocumentStore};

use crate::error::Result;
use crate::sharing::{DeleteOutcome, SharingService};
use crate::state::AppState;

/// One row of the plaza.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlazaEntry {
    pub shared_id: SharedId,
    pub article: SharedArticle,
    pub comment_count: usize,
    /// The current user may delete this entry (author or admin).
    pub can_delete: bool,
    /// The current user wrote it.
    pub is_mine: bool,
}

impl PlazaEntry {
    fn cursor(&self) -> PlazaCursor {
        PlazaCursor {
            shared_at: self.article.shared_at,
            shared_id: self.shared_id.clone(),
        }
    }
}

/// Position after the last returned entry. Entries are ordered by
/// `(shared_at, shared_id)` descending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlazaCursor {
    pub shared_at: DateTime<Utc>,
    pub shared_id: SharedId,
}

#[derive(Debug, Clone, Default)]
pub struct PlazaQuery {
    /// Only entries whose category name equals this.
    pub category: Option<String>,
    /// Entries per page; `None` returns everything in one page.
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PlazaPage {
    pub entries: Vec<PlazaEntry>,
    /// Where the next page starts; `None` on the last page.
    pub next: Option<PlazaCursor>,
}

#[derive(Clone)]
pub struct Plaza {
    state: AppState,
}

impl Plaza {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// All public diaries, newest first, optionally of one category.
    pub async fn list_shared(&self, category: Option<&str>) -> Result<Vec<PlazaEntry>> {
        let principal = self.state.identity.principal();
        let root = DocPath::parse(&paths::shared_diaries())?;
        let collection = self.state.store.get(&root).await?;

        let mut entries: Vec<PlazaEntry> = match collection {
            Some(Value::Object(children)) => children
                .into_iter()
                .filter_map(|(key, value)| decode_entry(key, value, &principal))
                .filter(|e| e.article.share_mode.is_discoverable())
                .filter(|e| category.map_or(true, |c| e.article.category == c))
                .collect(),
            _ => Vec::new(),
        };
        entries.sort_by(|a, b| b.cursor().cmp(&a.cursor()));
        Ok(entries)
    }

    /// Page through the listing. See [`PlazaPages`].
    pub fn pages(&self, query: PlazaQuery) -> PlazaPages {
        PlazaPages {
            plaza: self.clone(),
            query,
            cursor: None,
            done: false,
        }
    }

    /// Continue paging from a cursor handed out earlier.
    pub fn pages_from(&self, query: PlazaQuery, cursor: PlazaCursor) -> PlazaPages {
        PlazaPages {
            plaza: self.clone(),
            query,
            cursor: Some(cursor),
            done: false,
        }
    }

    /// Same rules as [`SharingService::delete_share`].
    pub async fn delete_from_plaza(&self, shared_id: &SharedId) -> Result<DeleteOutcome> {
        SharingService::new(self.state.clone())
            .delete_share(shared_id)
            .await
    }
}

fn decode_entry(key: String, value: Value, principal: &Principal) -> Option<PlazaEntry> {
    let diary = match serde_json::from_value::<SharedDiary>(value) {
        Ok(diary) => diary,
        Err(e) => {
            debug!(key = %key, error = %e, "skipping malformed shared diary");
            return None;
        }
    };
    Some(PlazaEntry {
        shared_id: SharedId(key),
        comment_count: diary.comments.len(),
        can_delete: can_delete(principal, &diary.article.author_id),
        is_mine: is_owner(principal, &diary.article.author_id),
        article: diary.article,
    })
}

/// Lazy, restartable pager over the plaza ordering.
///
/// Each page re-reads the collection and resumes strictly after the cursor,
/// so entries shared or deleted between pages never cause repeats.
pub struct PlazaPages {
    plaza: Plaza,
    query: PlazaQuery,
    cursor: Option<PlazaCursor>,
    done: bool,
}

impl PlazaPages {
    /// The next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<PlazaPage>> {
        if self.done {
            return Ok(None);
        }

        let all = self.plaza.list_shared(self.query.category.as_deref()).await?;
        let remaining: Vec<PlazaEntry> = match &self.cursor {
            Some(cursor) => all.into_iter().filter(|e| &e.cursor() < cursor).collect(),
            None => all,
        };

        let take = self.query.page_size.unwrap_or(remaining.len()).max(1);
        let has_more = remaining.len() > take;
        let entries: Vec<PlazaEntry> = remaining.into_iter().take(take).collect();

        let next = if has_more {
            entries.last().map(PlazaEntry::cursor)
        } else {
            None
        };
        self.done = next.is_none();
        if let Some(last) = entries.last() {
            self.cursor = Some(last.cursor());
        }

        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(PlazaPage { entries, next }))
    }

    /// Cursor of the last entry returned so far.
    pub fn cursor(&self) -> Option<&PlazaCursor> {
        self.cursor.as_ref()
    }

    /// Start again from the newest entry.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.done = false;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use w3_shared::{AdminAuthority, ShareMode};
    use w3_store::journal::ArticleDraft;
    use w3_sync::MemoryDocumentStore;

    use super::*;
    use crate::testing::device;

    async fn share(state: &AppState, title: &str, category: &str, mode: ShareMode) -> SharedId {
        let article = state
            .journal()
            .create(&ArticleDraft::new(title, category, "body"))
            .unwrap();
        let id = state
            .sharing()
            .create_share(&article, "author", mode)
            .await
            .unwrap();
        // Distinct shared_at values.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        id
    }

    #[tokio::test]
    async fn lists_public_newest_first_with_category_filter() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let bob = device(&store, None);

        let first = share(&alice, "one", "学习", ShareMode::Public).await;
        share(&alice, "hidden", "学习", ShareMode::Private).await;
        let third = share(&bob, "three", "生活", ShareMode::Public).await;

        let all = alice.plaza().list_shared(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.shared_id.clone()).collect();
        assert_eq!(ids, vec![third.clone(), first.clone()]);

        assert!(all[1].is_mine && all[1].can_delete);
        assert!(!all[0].is_mine && !all[0].can_delete);

        let study = alice.plaza().list_shared(Some("学习")).await.unwrap();
        assert_eq!(study.len(), 1);
        assert_eq!(study[0].shared_id, first);
    }

    #[tokio::test]
    async fn admin_sees_delete_flag_on_everything() {
        let store = MemoryDocumentStore::new();
        let authority = AdminAuthority::generate("admin626", "pw", Duration::days(1));
        let alice = device(&store, Some(&authority));
        let admin = device(&store, Some(&authority));
        admin.identity.login_admin(&authority, "admin626", "pw").await.unwrap();

        share(&alice, "one", "学习", ShareMode::Public).await;
        let listing = admin.plaza().list_shared(None).await.unwrap();
        assert!(listing[0].can_delete);
        assert!(!listing[0].is_mine);
    }

    #[tokio::test]
    async fn paging_matches_unpaged_order_and_restarts() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        for i in 0..5 {
            share(&alice, &format!("t{i}"), "学习", ShareMode::Public).await;
        }
        let plaza = alice.plaza();
        let unpaged: Vec<_> = plaza
            .list_shared(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.shared_id)
            .collect();

        let mut pages = plaza.pages(PlazaQuery {
            category: None,
            page_size: Some(2),
        });
        let mut paged = Vec::new();
        let mut sizes = Vec::new();
        while let Some(page) = pages.next_page().await.unwrap() {
            sizes.push(page.entries.len());
            paged.extend(page.entries.into_iter().map(|e| e.shared_id));
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(paged, unpaged);
        assert!(pages.next_page().await.unwrap().is_none());

        pages.restart();
        let again = pages.next_page().await.unwrap().unwrap();
        assert_eq!(again.entries[0].shared_id, unpaged[0]);

        // Resume from a cursor handed out earlier.
        let cursor = again.next.unwrap();
        let mut resumed = plaza.pages_from(PlazaQuery { category: None, page_size: Some(10) }, cursor);
        let rest = resumed.next_page().await.unwrap().unwrap();
        let rest_ids: Vec<_> = rest.entries.into_iter().map(|e| e.shared_id).collect();
        assert_eq!(rest_ids, unpaged[2..].to_vec());
        assert!(rest.next.is_none());
    }

    #[tokio::test]
    async fn no_page_size_means_one_page() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        for i in 0..3 {
            share(&alice, &format!("t{i}"), "学习", ShareMode::Public).await;
        }
        let mut pages = alice.plaza().pages(PlazaQuery::default());
        let page = pages.next_page().await.unwrap().unwrap();
        assert_eq!(page.entries.len(), 3);
        assert!(page.next.is_none());
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_plaza() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        assert!(alice.plaza().list_shared(None).await.unwrap().is_empty());
        assert!(alice.plaza().pages(PlazaQuery::default()).next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_from_plaza_is_gated() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let bob = device(&store, None);
        let id = share(&alice, "one", "学习", ShareMode::Public).await;

        assert!(bob.plaza().delete_from_plaza(&id).await.is_err());
        assert_eq!(
            alice.plaza().delete_from_plaza(&id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(alice.plaza().list_shared(None).await.unwrap().is_empty());
    }
}
