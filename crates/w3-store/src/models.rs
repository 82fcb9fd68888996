//! Domain model structs persisted in the local ledger.
//!
//! Every struct derives `Serialize` and `Deserialize`; field names follow the
//! camelCase layout of the exported JSON bundle.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use w3_shared::constants::{UNCATEGORIZED_ID, UNCATEGORIZED_NAME};

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// A private journal article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalArticle {
    /// Creation time in epoch millis; unique within the ledger.
    pub id: i64,
    pub title: String,
    /// Name (not id) of a [`Category`].
    pub category: String,
    /// Markdown source.
    pub content: String,
    /// Display date, `YYYY/M/D`.
    pub date: String,
}

/// Format a date the way article dates are displayed (`2025/1/2`).
pub fn display_date(at: DateTime<Local>) -> String {
    format!("{}/{}/{}", at.year(), at.month(), at.day())
}

/// Parse a display date back into a calendar date.
pub fn parse_display_date(date: &str) -> Option<NaiveDate> {
    let mut parts = date.trim().split(['/', '-']);
    let year = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Fixed colour palette for categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryColor {
    Blue,
    Green,
    Purple,
    Cyan,
    Amber,
    Pink,
    Rose,
    Slate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    /// Unique; articles reference categories by this name.
    pub name: String,
    pub emoji: String,
    pub color: CategoryColor,
}

impl Category {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        emoji: impl Into<String>,
        color: CategoryColor,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            emoji: emoji.into(),
            color,
        }
    }

    /// The category that absorbs articles of deleted categories.
    pub fn uncategorized() -> Self {
        Self::new(UNCATEGORIZED_ID, UNCATEGORIZED_NAME, "📁", CategoryColor::Slate)
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == UNCATEGORIZED_ID
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("study", "学习", "📚", CategoryColor::Blue),
            Self::new("life", "生活", "🌈", CategoryColor::Green),
            Self::new("essay", "随笔", "✍️", CategoryColor::Purple),
            Self::new("tech", "技术", "💻", CategoryColor::Cyan),
            Self::new("thought", "思考", "💭", CategoryColor::Amber),
        ]
    }
}

// ---------------------------------------------------------------------------
// Weekly plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanTask {
    pub id: i64,
    pub title: String,
    pub done: bool,
    /// Focus score, 1..=10.
    pub effort: u8,
    #[serde(default)]
    pub note: String,
}

/// The weekly planning board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyPlan {
    pub week: u32,
    pub title: String,
    pub goals: Vec<String>,
    pub tasks: Vec<PlanTask>,
}

impl Default for WeeklyPlan {
    fn default() -> Self {
        Self {
            week: 1,
            title: "高效突击周".to_string(),
            goals: vec![
                "完成 Java 集合学习".to_string(),
                "刷 20 道算法题".to_string(),
                "完成项目 UI".to_string(),
            ],
            tasks: Vec::new(),
        }
    }
}
