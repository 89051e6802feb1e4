pub mod habit;
pub mod todo;
pub mod user;

use thiserror::Error;

pub use habit::{
    Habit, HabitStatus, HabitWithStats, NewHabitRequest, PartialProgress, TrackHabitRequest,
    TrackedHabit, UpdateHabitRequest,
};
pub use todo::{NewTodoRequest, Priority, Todo, UNTITLED_TODO, UpdateTodoRequest};
pub use user::{NewUserRequest, User, UserProfile, habit_limit};

#[derive(Debug, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
