//! Journal categories.
//!
//! Articles refer to categories by name, so removing a category rewrites
//! the dependent articles to the "uncategorized" sentinel in the same
//! transaction.

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::kv::{self, keys};
use crate::models::{Category, CategoryColor, JournalArticle};

impl Database {
    /// Stored categories, or the default set when none were ever saved.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(kv::read_json(self.conn(), keys::CATEGORIES)?.unwrap_or_else(Category::defaults))
    }

    /// Add a category. Names are unique; the sentinel name is reserved.
    pub fn add_category(&self, name: &str, emoji: &str, color: CategoryColor) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("category name is required".into()));
        }

        let mut categories = self.list_categories()?;
        let sentinel = Category::uncategorized();
        if name == sentinel.name || categories.iter().any(|c| c.name == name) {
            return Err(StoreError::Duplicate(name.to_string()));
        }

        let category = Category::new(
            format!("cat_{}", chrono::Utc::now().timestamp_millis()),
            name,
            emoji,
            color,
        );
        categories.push(category.clone());
        kv::write_json(self.conn(), keys::CATEGORIES, &categories)?;
        Ok(category)
    }

    /// Delete a category by id and move its articles to the sentinel.
    ///
    /// Returns the number of articles reassigned. Deleting an id that no
    /// longer exists is a no-op.
    pub fn delete_category(&self, id: &str) -> Result<usize> {
        let sentinel = Category::uncategorized();
        if id == sentinel.id {
            return Err(StoreError::Invalid("the uncategorized category cannot be deleted".into()));
        }

        let tx = self.conn().unchecked_transaction()?;

        let mut categories: Vec<Category> =
            kv::read_json(&tx, keys::CATEGORIES)?.unwrap_or_else(Category::defaults);
        let Some(pos) = categories.iter().position(|c| c.id == id) else {
            return Ok(0);
        };
        let removed = categories.remove(pos);

        let mut articles: Vec<JournalArticle> =
            kv::read_json(&tx, keys::JOURNAL)?.unwrap_or_default();
        let mut moved = 0;
        for article in articles.iter_mut().filter(|a| a.category == removed.name) {
            article.category = sentinel.name.clone();
            moved += 1;
        }

        kv::write_json(&tx, keys::CATEGORIES, &categories)?;
        if moved > 0 {
            kv::write_json(&tx, keys::JOURNAL, &articles)?;
        }
        tx.commit()?;

        tracing::info!(category = %removed.name, moved, "category deleted");
        Ok(moved)
    }
}
