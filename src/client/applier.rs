//! Synchronous edits that predict the outcome of a mutation on the local
//! lists before the remote call resolves.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use super::ordering;
use crate::models::{
    HabitStatus, HabitWithStats, NewTodoRequest, Priority, Todo, UpdateTodoRequest,
};

pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Server ids are bare UUIDs, so the prefix never collides with them.
pub fn temporary_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

pub fn set_habit_status(
    habits: &mut [HabitWithStats],
    habit_id: &str,
    status: HabitStatus,
    completed_count: Option<i64>,
) -> bool {
    let Some(habit) = habits.iter_mut().find(|h| h.id() == habit_id) else {
        return false;
    };

    habit.status = status;
    let goal = habit.habit.goal_count;
    match completed_count {
        Some(count) => habit.remaining_count = goal.saturating_sub(count).clamp(0, goal),
        None if status == HabitStatus::Completed => habit.remaining_count = 0,
        None => {}
    }
    true
}

pub fn remove_habit(habits: &mut Vec<HabitWithStats>, habit_id: &str) -> bool {
    let before = habits.len();
    habits.retain(|h| h.id() != habit_id);
    habits.len() != before
}

pub fn remove_todo(todos: &mut Vec<Todo>, todo_id: &str) -> Option<Todo> {
    let index = todos.iter().position(|t| t.id == todo_id)?;
    Some(todos.remove(index))
}

/// Builds the placeholder for a todo that is still being created and inserts
/// it by priority. Returns its temporary id.
pub fn insert_placeholder(todos: &mut Vec<Todo>, req: &NewTodoRequest) -> String {
    let id = temporary_id();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let placeholder = Todo {
        id: id.clone(),
        user_id: String::new(),
        title: req.title_or_default(),
        description: req.description.clone(),
        priority: req.priority.unwrap_or(Priority::P3),
        is_completed: false,
        created_at: now.clone(),
        updated_at: now,
    };
    ordering::insert_by_priority(todos, placeholder);
    id
}

/// Swaps the placeholder `temp_id` for `canonical` in place.
pub fn replace_placeholder(todos: &mut [Todo], temp_id: &str, canonical: Todo) -> bool {
    match todos.iter_mut().find(|t| t.id == temp_id) {
        Some(slot) => {
            *slot = canonical;
            true
        }
        None => false,
    }
}

/// Merges `patch` into the todo and moves it to where the new state belongs:
/// a priority change re-inserts by priority, anything else goes to the end
/// of its own tier.
pub fn update_todo(todos: &mut Vec<Todo>, todo_id: &str, patch: &UpdateTodoRequest) -> bool {
    let Some(mut todo) = remove_todo(todos, todo_id) else {
        return false;
    };
    let previous = todo.priority;
    patch.apply_to(&mut todo);

    if patch.priority.is_some_and(|p| p != previous) {
        ordering::insert_by_priority(todos, todo);
    } else {
        ordering::insert_after_same_priority(todos, todo);
    }
    true
}

/// Replaces the predicted record with the server's and re-sorts by tier.
pub fn reconcile_updated(todos: &mut Vec<Todo>, canonical: Todo) {
    todos.retain(|t| t.id != canonical.id);
    todos.push(canonical);
    ordering::sort_by_priority(todos);
}

pub fn mark_todo_complete(todos: &mut [Todo], todo_id: &str) -> bool {
    match todos.iter_mut().find(|t| t.id == todo_id) {
        Some(todo) => {
            todo.is_completed = true;
            todo.updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            true
        }
        None => false,
    }
}
