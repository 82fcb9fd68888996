//! Weekly plan ("war room") operations.

use chrono::Utc;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::kv::{self, keys};
use crate::models::{PlanTask, WeeklyPlan};

pub const MIN_EFFORT: u8 = 1;
pub const MAX_EFFORT: u8 = 10;

impl WeeklyPlan {
    /// Percentage of finished tasks, rounded. Zero for an empty plan.
    pub fn completion_rate(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let done = self.tasks.iter().filter(|t| t.done).count() as f64;
        ((done / self.tasks.len() as f64) * 100.0).round() as u8
    }

    fn task_mut(&mut self, id: i64) -> Result<&mut PlanTask> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)
    }
}

fn clamp_effort(effort: u8) -> u8 {
    effort.clamp(MIN_EFFORT, MAX_EFFORT)
}

impl Database {
    pub fn weekly_plan(&self) -> Result<WeeklyPlan> {
        Ok(kv::read_json(self.conn(), keys::WEEKLY_PLAN)?.unwrap_or_default())
    }

    pub fn save_weekly_plan(&self, plan: &WeeklyPlan) -> Result<()> {
        kv::write_json(self.conn(), keys::WEEKLY_PLAN, plan)
    }

    fn edit_plan<T>(&self, edit: impl FnOnce(&mut WeeklyPlan) -> Result<T>) -> Result<T> {
        let mut plan = self.weekly_plan()?;
        let out = edit(&mut plan)?;
        self.save_weekly_plan(&plan)?;
        Ok(out)
    }

    pub fn add_goal(&self, goal: &str) -> Result<WeeklyPlan> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(StoreError::Invalid("goal is empty".into()));
        }
        self.edit_plan(|plan| {
            plan.goals.push(goal.to_string());
            Ok(plan.clone())
        })
    }

    pub fn remove_goal(&self, index: usize) -> Result<WeeklyPlan> {
        self.edit_plan(|plan| {
            if index >= plan.goals.len() {
                return Err(StoreError::NotFound);
            }
            plan.goals.remove(index);
            Ok(plan.clone())
        })
    }

    /// Append a task. Effort is clamped into range.
    pub fn add_task(&self, title: &str, effort: u8, note: &str) -> Result<PlanTask> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::Invalid("task title is empty".into()));
        }
        self.edit_plan(|plan| {
            let mut id = Utc::now().timestamp_millis();
            while plan.tasks.iter().any(|t| t.id == id) {
                id += 1;
            }
            let task = PlanTask {
                id,
                title: title.to_string(),
                done: false,
                effort: clamp_effort(effort),
                note: note.to_string(),
            };
            plan.tasks.push(task.clone());
            Ok(task)
        })
    }

    pub fn toggle_task(&self, id: i64) -> Result<PlanTask> {
        self.edit_plan(|plan| {
            let task = plan.task_mut(id)?;
            task.done = !task.done;
            Ok(task.clone())
        })
    }

    pub fn set_task_effort(&self, id: i64, effort: u8) -> Result<PlanTask> {
        self.edit_plan(|plan| {
            let task = plan.task_mut(id)?;
            task.effort = clamp_effort(effort);
            Ok(task.clone())
        })
    }

    pub fn remove_task(&self, id: i64) -> Result<bool> {
        self.edit_plan(|plan| {
            let before = plan.tasks.len();
            plan.tasks.retain(|t| t.id != id);
            Ok(plan.tasks.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_served_until_saved() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.weekly_plan().unwrap();
        assert_eq!(plan.title, "高效突击周");
        assert_eq!(plan.goals.len(), 3);
        assert_eq!(plan.completion_rate(), 0);
    }

    #[test]
    fn effort_is_clamped() {
        let db = Database::open_in_memory().unwrap();
        let task = db.add_task("algorithms", 42, "").unwrap();
        assert_eq!(task.effort, 10);
        let task = db.set_task_effort(task.id, 0).unwrap();
        assert_eq!(task.effort, 1);
    }

    #[test]
    fn completion_rate_rounds() {
        let db = Database::open_in_memory().unwrap();
        let a = db.add_task("a", 5, "").unwrap();
        db.add_task("b", 5, "").unwrap();
        db.add_task("c", 5, "").unwrap();
        db.toggle_task(a.id).unwrap();
        assert_eq!(db.weekly_plan().unwrap().completion_rate(), 33);

        assert!(db.remove_task(a.id).unwrap());
        assert!(!db.remove_task(a.id).unwrap());
        assert_eq!(db.weekly_plan().unwrap().completion_rate(), 0);
    }

    #[test]
    fn goals_add_and_remove() {
        let db = Database::open_in_memory().unwrap();
        let plan = db.add_goal("ship it").unwrap();
        assert_eq!(plan.goals.last().map(String::as_str), Some("ship it"));
        let plan = db.remove_goal(0).unwrap();
        assert_eq!(plan.goals.len(), 3);
        assert!(matches!(db.remove_goal(99), Err(StoreError::NotFound)));
    }
}
