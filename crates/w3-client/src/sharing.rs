//! Creating, joining and deleting shared diaries.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use w3_shared::permission::{authorize, Action};
use w3_shared::protocol::paths;
use w3_shared::{ShareMode, SharedArticle, SharedDiary, SharedId};
use w3_store::JournalArticle;
use w3_sync::{DocPath, DocumentStore, DocumentStoreExt, SyncError};

use crate::error::{required, Result, ShareError};
use crate::state::{lock, AppState};

const INVALID_CODE: &str = "invalid or expired share code";

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The remote record was already gone; only local bookkeeping was cleared.
    AlreadyGone,
}

#[derive(Clone)]
pub struct SharingService {
    state: AppState,
}

impl SharingService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Publish a frozen copy of `article` and remember its share code.
    ///
    /// A ledger failure after the remote write is logged; the share exists
    /// and its code is still returned.
    pub async fn create_share(
        &self,
        article: &JournalArticle,
        display_name: &str,
        mode: ShareMode,
    ) -> Result<SharedId> {
        let author = required(display_name, "display name")?;
        if let Err(e) = self.state.identity.set_display_name(&author) {
            warn!(error = %e, "could not persist display name");
        }

        let shared_id = SharedId::generate();
        let diary = SharedDiary {
            article: SharedArticle {
                id: article.id,
                title: article.title.clone(),
                category: article.category.clone(),
                content: article.content.clone(),
                date: article.date.clone(),
                author,
                author_id: self.state.identity.user_id(),
                shared_at: Utc::now(),
                share_mode: mode,
            },
            creator_id: article.id,
            comments: BTreeMap::new(),
        };

        let path = DocPath::parse(&paths::shared_diary(&shared_id))?;
        self.state.store.set_as(&path, &diary).await?;

        if let Err(e) = lock(&self.state.ledger).record_share(article.id, &shared_id) {
            warn!(error = %e, shared_id = %shared_id, "shared, but could not record the share locally");
        }

        info!(shared_id = %shared_id, article_id = article.id, mode = ?mode, "diary shared");
        Ok(shared_id)
    }

    /// Look up a diary by its code. Anyone holding the code may read it,
    /// whatever its share mode.
    pub async fn join_share(&self, code: &str, display_name: &str) -> Result<SharedArticle> {
        let code = SharedId::from(required(code, "share code")?.as_str());
        let name = required(display_name, "display name")?;

        let diary = self
            .fetch(&code)
            .await?
            .ok_or_else(|| ShareError::NotFound(INVALID_CODE.into()))?;

        if let Err(e) = self.state.identity.set_display_name(&name) {
            warn!(error = %e, "could not persist display name");
        }
        debug!(shared_id = %code, "joined share");
        Ok(diary.article)
    }

    /// Delete a shared diary, then forget every local mapping to it.
    ///
    /// The permission check runs against the stored author before anything
    /// is mutated. A record that no longer exists counts as deleted.
    pub async fn delete_share(&self, shared_id: &SharedId) -> Result<DeleteOutcome> {
        let Some(diary) = self.fetch(shared_id).await? else {
            self.forget(shared_id);
            return Ok(DeleteOutcome::AlreadyGone);
        };

        let principal = self.state.identity.principal();
        authorize(
            &principal,
            Action::DeleteDiary {
                author_id: &diary.article.author_id,
            },
        )?;

        let path = DocPath::parse(&paths::shared_diary(shared_id))?;
        self.state.store.remove(&path).await?;
        self.forget(shared_id);

        info!(
            shared_id = %shared_id,
            by = %principal.user_id,
            admin = principal.is_admin(),
            "shared diary deleted"
        );
        Ok(DeleteOutcome::Deleted)
    }

    /// The share code recorded for a local article.
    pub fn share_for(&self, article_id: i64) -> Result<Option<SharedId>> {
        Ok(lock(&self.state.ledger).share_for_article(article_id)?)
    }

    pub(crate) async fn fetch(&self, shared_id: &SharedId) -> Result<Option<SharedDiary>> {
        let path = match DocPath::parse(&paths::shared_diary(shared_id)) {
            Ok(path) => path,
            // A code that is not even a valid path was never issued.
            Err(SyncError::InvalidPath(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(self.state.store.get_as::<SharedDiary>(&path).await?)
    }

    pub(crate) fn forget(&self, shared_id: &SharedId) {
        if let Err(e) = lock(&self.state.ledger).forget_share(shared_id) {
            warn!(error = %e, shared_id = %shared_id, "could not clear local share record");
        }
    }

    pub(crate) fn state(&self) -> &AppState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use w3_shared::{AdminAuthority, UserId};
    use w3_store::journal::ArticleDraft;
    use w3_sync::{DocumentStore, MemoryDocumentStore};

    use super::*;
    use crate::testing::device;

    fn write_article(state: &AppState, title: &str, category: &str, content: &str) -> JournalArticle {
        state
            .journal()
            .create(&ArticleDraft::new(title, category, content))
            .unwrap()
    }

    #[tokio::test]
    async fn share_then_join() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let bob = device(&store, None);

        let article = write_article(&alice, "A", "学习", "hello");
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Public)
            .await
            .unwrap();
        assert_eq!(alice.sharing().share_for(article.id).unwrap(), Some(code.clone()));

        let joined = bob.sharing().join_share(code.as_str(), "Bob").await.unwrap();
        assert_eq!(joined.title, "A");
        assert_eq!(joined.author, "Alice");
        assert_eq!(joined.author_id, alice.identity.user_id());
        assert_eq!(bob.identity.display_name(), "Bob");
    }

    #[tokio::test]
    async fn snapshot_is_frozen() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let article = write_article(&alice, "A", "学习", "hello");
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Public)
            .await
            .unwrap();

        alice
            .journal()
            .update(article.id, &ArticleDraft::new("A2", "生活", "edited"))
            .unwrap();

        let shared = alice.sharing().join_share(code.as_str(), "Alice").await.unwrap();
        assert_eq!(shared.title, "A");
        assert_eq!(shared.content, "hello");
    }

    #[tokio::test]
    async fn private_shares_are_readable_by_code() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let article = write_article(&alice, "secret", "随笔", "shh");
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Private)
            .await
            .unwrap();

        let bob = device(&store, None);
        let joined = bob.sharing().join_share(code.as_str(), "Bob").await.unwrap();
        assert_eq!(joined.share_mode, ShareMode::Private);
    }

    #[tokio::test]
    async fn join_validates_before_reading() {
        let store = MemoryDocumentStore::new();
        let bob = device(&store, None);

        assert!(matches!(
            bob.sharing().join_share("  ", "Bob").await,
            Err(ShareError::Validation(_))
        ));
        assert!(matches!(
            bob.sharing().join_share("diary_1_x", "").await,
            Err(ShareError::Validation(_))
        ));
        let err = bob.sharing().join_share("diary_1_missing", "Bob").await.unwrap_err();
        assert!(matches!(err, ShareError::NotFound(ref m) if m == INVALID_CODE));
        assert!(matches!(
            bob.sharing().join_share("not.a/valid$code", "Bob").await,
            Err(ShareError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_requires_display_name_and_writes_nothing() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let article = write_article(&alice, "A", "学习", "hello");

        let err = alice
            .sharing()
            .create_share(&article, " ", ShareMode::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::Validation(_)));
        assert_eq!(store.to_value(), serde_json::Value::Null);
        assert!(alice.sharing().share_for(article.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn admin_deletes_anyones_diary_stranger_cannot() {
        let store = MemoryDocumentStore::new();
        let authority = AdminAuthority::generate("admin626", "pw", Duration::days(1));
        let alice = device(&store, Some(&authority));
        let mallory = device(&store, Some(&authority));
        let admin = device(&store, Some(&authority));
        admin
            .identity
            .login_admin(&authority, "admin626", "pw")
            .await
            .unwrap();

        let article = write_article(&alice, "A", "学习", "hello");
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Public)
            .await
            .unwrap();

        let before = store.to_value();
        let err = mallory.sharing().delete_share(&code).await.unwrap_err();
        assert!(matches!(err, ShareError::Forbidden(_)));
        assert_eq!(store.to_value(), before);

        assert_eq!(
            admin.sharing().delete_share(&code).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(matches!(
            mallory.sharing().join_share(code.as_str(), "M").await,
            Err(ShareError::NotFound(_))
        ));

        // Alice still has a stale pointer; deleting heals it.
        assert!(alice.sharing().share_for(article.id).unwrap().is_some());
        assert_eq!(
            alice.sharing().delete_share(&code).await.unwrap(),
            DeleteOutcome::AlreadyGone
        );
        assert!(alice.sharing().share_for(article.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn author_deletes_own_diary_twice() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let article = write_article(&alice, "A", "学习", "hello");
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Public)
            .await
            .unwrap();

        assert_eq!(
            alice.sharing().delete_share(&code).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            alice.sharing().delete_share(&code).await.unwrap(),
            DeleteOutcome::AlreadyGone
        );
        let path = DocPath::parse(&paths::shared_diary(&code)).unwrap();
        assert_eq!(store.get(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ownership_follows_author_id() {
        let store = MemoryDocumentStore::new();
        let alice = device(&store, None);
        let article = write_article(&alice, "A", "学习", "hello");
        let code = alice
            .sharing()
            .create_share(&article, "Alice", ShareMode::Public)
            .await
            .unwrap();

        let diary = alice.sharing().fetch(&code).await.unwrap().unwrap();
        assert_eq!(diary.article.author_id, alice.identity.user_id());
        assert_ne!(diary.article.author_id, UserId::from("user_someone_else"));
    }
}
