use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::ParseEnumError;

/// Todo priority tier. `P1` is the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    P1,
    P2,
    #[default]
    P3,
}

impl Priority {
    /// Lower weight sorts first.
    pub fn weight(self) -> u8 {
        match self {
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P1 => "p1",
            Priority::P2 => "p2",
            Priority::P3 => "p3",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p1" => Ok(Priority::P1),
            "p2" => Ok(Priority::P2),
            "p3" => Ok(Priority::P3),
            other => Err(ParseEnumError::new("priority", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for Todo {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let priority: String = row.try_get("priority")?;
        Ok(Todo {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            priority: priority
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            is_completed: row.try_get("is_completed")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Title stored for a todo created with a blank one.
pub const UNTITLED_TODO: &str = "Untitled Todo";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

impl NewTodoRequest {
    pub fn title_or_default(&self) -> String {
        match self.title.trim() {
            "" => UNTITLED_TODO.to_string(),
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub is_completed: Option<bool>,
}

impl UpdateTodoRequest {
    /// Merges the present fields into `todo`.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(description) = &self.description {
            todo.description = Some(description.clone());
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(is_completed) = self.is_completed {
            todo.is_completed = is_completed;
        }
    }
}
