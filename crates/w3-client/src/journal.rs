//! Client-side access to the private journal, categories and weekly plan.

use std::sync::{Arc, Mutex};

use w3_store::journal::ArticleDraft;
use w3_store::{
    Category, CategoryColor, Database, ExportBundle, ImportStats, JournalArticle, PlanTask,
    StoreError, WeeklyPlan,
};

use crate::state::lock;

type Result<T> = std::result::Result<T, StoreError>;

/// Thin locking facade over the ledger's journal helpers.
#[derive(Clone)]
pub struct JournalService {
    ledger: Arc<Mutex<Database>>,
}

impl JournalService {
    pub fn new(ledger: Arc<Mutex<Database>>) -> Self {
        Self { ledger }
    }

    fn with<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        f(&*lock(&self.ledger))
    }

    // -- articles --

    pub fn list(&self) -> Result<Vec<JournalArticle>> {
        self.with(|db| db.list_articles())
    }

    pub fn get(&self, id: i64) -> Result<JournalArticle> {
        self.with(|db| db.get_article(id))
    }

    pub fn create(&self, draft: &ArticleDraft) -> Result<JournalArticle> {
        self.with(|db| db.create_article(draft))
    }

    pub fn update(&self, id: i64, draft: &ArticleDraft) -> Result<JournalArticle> {
        self.with(|db| db.update_article(id, draft))
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        self.with(|db| db.delete_article(id))
    }

    pub fn search(&self, query: &str) -> Result<Vec<JournalArticle>> {
        self.with(|db| db.search_articles(query))
    }

    pub fn archive_by_month(&self) -> Result<Vec<(String, Vec<JournalArticle>)>> {
        self.with(|db| db.archive_by_month())
    }

    pub fn archive_by_category(&self) -> Result<Vec<(String, Vec<JournalArticle>)>> {
        self.with(|db| db.archive_by_category())
    }

    // -- categories --

    pub fn categories(&self) -> Result<Vec<Category>> {
        self.with(|db| db.list_categories())
    }

    pub fn add_category(&self, name: &str, emoji: &str, color: CategoryColor) -> Result<Category> {
        self.with(|db| db.add_category(name, emoji, color))
    }

    /// Returns how many articles moved to the uncategorized sentinel.
    pub fn delete_category(&self, id: &str) -> Result<usize> {
        self.with(|db| db.delete_category(id))
    }

    // -- weekly plan --

    pub fn plan(&self) -> Result<WeeklyPlan> {
        self.with(|db| db.weekly_plan())
    }

    pub fn add_goal(&self, goal: &str) -> Result<WeeklyPlan> {
        self.with(|db| db.add_goal(goal))
    }

    pub fn remove_goal(&self, index: usize) -> Result<WeeklyPlan> {
        self.with(|db| db.remove_goal(index))
    }

    pub fn add_task(&self, title: &str, effort: u8, note: &str) -> Result<PlanTask> {
        self.with(|db| db.add_task(title, effort, note))
    }

    pub fn toggle_task(&self, id: i64) -> Result<PlanTask> {
        self.with(|db| db.toggle_task(id))
    }

    pub fn set_task_effort(&self, id: i64, effort: u8) -> Result<PlanTask> {
        self.with(|db| db.set_task_effort(id, effort))
    }

    pub fn remove_task(&self, id: i64) -> Result<bool> {
        self.with(|db| db.remove_task(id))
    }

    // -- export / import --

    pub fn export(&self) -> Result<ExportBundle> {
        self.with(|db| db.export_bundle())
    }

    pub fn export_markdown(&self) -> Result<String> {
        self.with(|db| db.export_markdown())
    }

    pub fn import(&self, bundle: &ExportBundle) -> Result<ImportStats> {
        self.with(|db| db.import_bundle(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JournalService {
        JournalService::new(Arc::new(Mutex::new(Database::open_in_memory().unwrap())))
    }

    #[test]
    fn category_delete_moves_articles() {
        let journal = service();
        let cat = journal.add_category("旅行", "✈️", CategoryColor::Rose).unwrap();
        journal.create(&ArticleDraft::new("trip", "旅行", "x")).unwrap();

        assert_eq!(journal.delete_category(&cat.id).unwrap(), 1);
        assert_eq!(journal.list().unwrap()[0].category, "未分类");
        assert_eq!(journal.delete_category(&cat.id).unwrap(), 0);
    }

    #[test]
    fn export_import_between_devices() {
        let a = service();
        a.create(&ArticleDraft::new("t", "学习", "c")).unwrap();
        a.add_task("task", 3, "").unwrap();

        let b = service();
        let stats = b.import(&a.export().unwrap()).unwrap();
        assert_eq!(stats.articles_imported, 1);
        assert_eq!(b.plan().unwrap().tasks.len(), 1);
    }
}
