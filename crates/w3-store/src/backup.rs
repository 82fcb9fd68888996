use std::fmt::Write;

use chrono::Local;
use serde::{Deserialize, Serialize};

use w3_shared::constants::{APP_NAME, EXPORT_FORMAT_VERSION};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{JournalArticle, WeeklyPlan};

/// Portable export of the plan and the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    /// RFC 3339 time of the export
    pub export_date: String,
    /// Absent keys are left untouched on import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warroom: Option<WeeklyPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<Vec<JournalArticle>>,
}

/// What an import actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub plan_imported: bool,
    pub articles_imported: usize,
}

impl Database {
    pub fn export_bundle(&self) -> Result<ExportBundle> {
        Ok(ExportBundle {
            version: EXPORT_FORMAT_VERSION.to_string(),
            export_date: Local::now().to_rfc3339(),
            warroom: Some(self.weekly_plan()?),
            journal: Some(self.list_articles()?),
        })
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_bundle()?)?)
    }

    /// Human-readable Markdown rendering of the same data.
    pub fn export_markdown(&self) -> Result<String> {
        let plan = self.weekly_plan()?;
        let articles = self.list_articles()?;

        let mut out = String::new();
        render_markdown(&mut out, &plan, &articles)
            .map_err(|e| StoreError::Invalid(format!("markdown export failed: {e}")))?;
        Ok(out)
    }

    /// Write whichever sections the bundle carries.
    pub fn import_bundle(&self, bundle: &ExportBundle) -> Result<ImportStats> {
        let mut stats = ImportStats::default();

        let tx = self.conn().unchecked_transaction()?;
        if let Some(plan) = &bundle.warroom {
            crate::kv::write_json(&tx, crate::kv::keys::WEEKLY_PLAN, plan)?;
            stats.plan_imported = true;
        }
        if let Some(journal) = &bundle.journal {
            crate::kv::write_json(&tx, crate::kv::keys::JOURNAL, journal)?;
            stats.articles_imported = journal.len();
        }
        tx.commit()?;

        tracing::info!(
            version = %bundle.version,
            plan = stats.plan_imported,
            articles = stats.articles_imported,
            "bundle imported"
        );
        Ok(stats)
    }

    pub fn import_json(&self, json: &str) -> Result<ImportStats> {
        let bundle: ExportBundle = serde_json::from_str(json)?;
        self.import_bundle(&bundle)
    }
}

fn render_markdown(
    out: &mut impl Write,
    plan: &WeeklyPlan,
    articles: &[JournalArticle],
) -> std::fmt::Result {
    writeln!(out, "# {APP_NAME} 数据导出\n")?;
    writeln!(out, "导出时间: {}\n", Local::now().format("%Y/%m/%d %H:%M:%S"))?;

    writeln!(out, "## {} (第 {} 周)\n", plan.title, plan.week)?;
    writeln!(out, "### 目标\n")?;
    for goal in &plan.goals {
        writeln!(out, "- {goal}")?;
    }
    writeln!(out, "\n### 任务\n")?;
    for task in &plan.tasks {
        let mark = if task.done { "x" } else { " " };
        writeln!(out, "- [{mark}] {} (专注度: {}/10)", task.title, task.effort)?;
    }
    writeln!(out, "\n完成率: {}%\n", plan.completion_rate())?;

    writeln!(out, "## 日记\n")?;
    for article in articles {
        writeln!(out, "### {}\n", article.title)?;
        writeln!(out, "分类: {} | 日期: {}\n", article.category, article.date)?;
        writeln!(out, "{}\n\n---\n", article.content)?;
    }
    Ok(())
}
