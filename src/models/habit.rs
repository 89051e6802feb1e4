use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ParseEnumError;

/// Per-day status of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HabitStatus {
    #[default]
    Current,
    Completed,
    Skipped,
    Failed,
}

impl HabitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HabitStatus::Current => "CURRENT",
            HabitStatus::Completed => "COMPLETED",
            HabitStatus::Skipped => "SKIPPED",
            HabitStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for HabitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURRENT" => Ok(HabitStatus::Current),
            "COMPLETED" => Ok(HabitStatus::Completed),
            "SKIPPED" => Ok(HabitStatus::Skipped),
            "FAILED" => Ok(HabitStatus::Failed),
            other => Err(ParseEnumError::new("habit status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub environment: Option<String>,
    pub goal_count: i64,
    pub created_at: String,
}

/// A habit as it looks on one calendar day, with its all-time statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitWithStats {
    #[serde(flatten)]
    pub habit: Habit,
    pub status: HabitStatus,
    pub remaining_count: i64,
    pub completed: i64,
    pub skipped: i64,
    pub failed: i64,
    pub total: i64,
    pub streak: i64,
}

impl HabitWithStats {
    pub fn id(&self) -> &str {
        &self.habit.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHabitRequest {
    pub title: String,
    pub environment: Option<String>,
    pub goal_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHabitRequest {
    pub title: Option<String>,
    pub environment: Option<String>,
    pub goal_count: Option<i64>,
}

impl UpdateHabitRequest {
    /// Merges the present fields into `habit`. The goal never drops below one.
    pub fn apply_to(&self, habit: &mut Habit) {
        if let Some(title) = &self.title {
            habit.title = title.clone();
        }
        if let Some(environment) = &self.environment {
            habit.environment = Some(environment.clone());
        }
        if let Some(goal_count) = self.goal_count {
            habit.goal_count = goal_count.max(1);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackHabitRequest {
    /// Local calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub status: HabitStatus,
    #[serde(default)]
    pub completed_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedHabit {
    pub habit_id: String,
    pub date: String,
    pub status: HabitStatus,
    pub completed_count: i64,
    pub updated_at: String,
}

/// Counter behind the partial-completion popover: starts at what is already
/// done, moves between that floor and the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialProgress {
    goal: i64,
    floor: i64,
    count: i64,
}

impl PartialProgress {
    pub fn open(goal_count: i64, remaining_count: i64) -> Self {
        let done = goal_count.saturating_sub(remaining_count).clamp(0, goal_count);
        Self {
            goal: goal_count,
            floor: done,
            count: done,
        }
    }

    pub fn increment(&mut self) {
        if self.count < self.goal {
            self.count += 1;
        }
    }

    pub fn decrement(&mut self) {
        if self.count > self.floor {
            self.count -= 1;
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn is_complete(&self) -> bool {
        self.count >= self.goal
    }

    /// Status to record for the current count.
    pub fn status(&self) -> HabitStatus {
        if self.is_complete() {
            HabitStatus::Completed
        } else {
            HabitStatus::Current
        }
    }
}
