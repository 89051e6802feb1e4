use std::collections::HashMap;

use crate::models::{HabitWithStats, Todo};

/// Inserts `todo` in front of the first entry with a lower priority, or at
/// the end. Returns the index it landed at.
pub fn insert_by_priority(todos: &mut Vec<Todo>, todo: Todo) -> usize {
    let weight = todo.priority.weight();
    match todos.iter().position(|t| t.priority.weight() > weight) {
        Some(index) => {
            todos.insert(index, todo);
            index
        }
        None => {
            todos.push(todo);
            todos.len() - 1
        }
    }
}

/// Inserts `todo` right after the run of entries sharing its priority. With
/// no such run it falls back to [`insert_by_priority`].
pub fn insert_after_same_priority(todos: &mut Vec<Todo>, todo: Todo) -> usize {
    let Some(start) = todos.iter().position(|t| t.priority == todo.priority) else {
        return insert_by_priority(todos, todo);
    };

    let mut index = start;
    while index < todos.len() && todos[index].priority == todo.priority {
        index += 1;
    }
    todos.insert(index, todo);
    index
}

/// Stable: entries of the same priority keep their relative order.
pub fn sort_by_priority(todos: &mut [Todo]) {
    todos.sort_by_key(|t| t.priority.weight());
}

pub fn is_tiered(todos: &[Todo]) -> bool {
    todos
        .windows(2)
        .all(|w| w[0].priority.weight() <= w[1].priority.weight())
}

/// Orders habits by their position in `order`. Habits missing from `order`
/// go after the rest, in the order they arrived.
pub fn sort_by_stored_order(habits: &mut [HabitWithStats], order: &[String]) {
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    habits.sort_by_key(|h| rank.get(h.id()).copied().unwrap_or(usize::MAX));
}
