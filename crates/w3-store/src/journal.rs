//! CRUD and views over the journal articles.
//!
//! Articles are kept as a single JSON array under [`keys::JOURNAL`], newest
//! first.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::kv::{self, keys};
use crate::models::{display_date, parse_display_date, JournalArticle};

/// Fields supplied by the user when writing an article.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub title: String,
    pub category: String,
    pub content: String,
}

impl ArticleDraft {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            content: content.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Invalid("title is required".into()));
        }
        if self.content.trim().is_empty() {
            return Err(StoreError::Invalid("content is required".into()));
        }
        Ok(())
    }
}

impl Database {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// All articles, newest first.
    pub fn list_articles(&self) -> Result<Vec<JournalArticle>> {
        Ok(kv::read_json(self.conn(), keys::JOURNAL)?.unwrap_or_default())
    }

    pub fn get_article(&self, id: i64) -> Result<JournalArticle> {
        self.list_articles()?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)
    }

    /// Case-insensitive substring match on the title.
    pub fn search_articles(&self, query: &str) -> Result<Vec<JournalArticle>> {
        let needle = query.trim().to_lowercase();
        let articles = self.list_articles()?;
        if needle.is_empty() {
            return Ok(articles);
        }
        Ok(articles
            .into_iter()
            .filter(|a| a.title.to_lowercase().contains(&needle))
            .collect())
    }

    /// Articles grouped by `YYYY-MM`, newest month first.
    ///
    /// Articles whose date cannot be parsed are left out.
    pub fn archive_by_month(&self) -> Result<Vec<(String, Vec<JournalArticle>)>> {
        let mut months: BTreeMap<String, Vec<JournalArticle>> = BTreeMap::new();
        for article in self.list_articles()? {
            let Some(date) = parse_display_date(&article.date) else {
                tracing::debug!(id = article.id, date = %article.date, "unparseable article date");
                continue;
            };
            months
                .entry(date.format("%Y-%m").to_string())
                .or_default()
                .push(article);
        }
        Ok(months.into_iter().rev().collect())
    }

    /// Articles grouped by category name, alphabetical.
    pub fn archive_by_category(&self) -> Result<Vec<(String, Vec<JournalArticle>)>> {
        let mut groups: BTreeMap<String, Vec<JournalArticle>> = BTreeMap::new();
        for article in self.list_articles()? {
            groups.entry(article.category.clone()).or_default().push(article);
        }
        Ok(groups.into_iter().collect())
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Create an article stamped with the current time.
    pub fn create_article(&self, draft: &ArticleDraft) -> Result<JournalArticle> {
        self.create_article_at(draft, Local::now())
    }

    /// Create an article as of `now`. The id is the creation millis, bumped
    /// past any existing id so that ids stay unique.
    pub fn create_article_at(
        &self,
        draft: &ArticleDraft,
        now: DateTime<Local>,
    ) -> Result<JournalArticle> {
        draft.validate()?;

        let mut articles = self.list_articles()?;
        let mut id = now.timestamp_millis();
        while articles.iter().any(|a| a.id == id) {
            id += 1;
        }

        let article = JournalArticle {
            id,
            title: draft.title.trim().to_string(),
            category: draft.category.clone(),
            content: draft.content.clone(),
            date: display_date(now),
        };
        articles.insert(0, article.clone());
        kv::write_json(self.conn(), keys::JOURNAL, &articles)?;

        tracing::debug!(id, "journal article created");
        Ok(article)
    }

    /// Replace title, category and content. Id and date are kept.
    pub fn update_article(&self, id: i64, draft: &ArticleDraft) -> Result<JournalArticle> {
        draft.validate()?;

        let mut articles = self.list_articles()?;
        let article = articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        article.title = draft.title.trim().to_string();
        article.category = draft.category.clone();
        article.content = draft.content.clone();
        let updated = article.clone();

        kv::write_json(self.conn(), keys::JOURNAL, &articles)?;
        Ok(updated)
    }

    /// Delete an article. Returns `true` if it existed.
    pub fn delete_article(&self, id: i64) -> Result<bool> {
        let mut articles = self.list_articles()?;
        let before = articles.len();
        articles.retain(|a| a.id != id);
        if articles.len() == before {
            return Ok(false);
        }
        kv::write_json(self.conn(), keys::JOURNAL, &articles)?;
        Ok(true)
    }

    /// Overwrite the whole article list.
    pub fn replace_articles(&self, articles: &[JournalArticle]) -> Result<()> {
        kv::write_json(self.conn(), keys::JOURNAL, &articles)
    }
}
