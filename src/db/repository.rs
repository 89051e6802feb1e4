use std::collections::HashMap;

use chrono::{NaiveDate, SecondsFormat, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::stats::{self, HabitLogRow};
use crate::models::{
    Habit, HabitStatus, HabitWithStats, NewHabitRequest, NewTodoRequest, Todo, TrackHabitRequest,
    TrackedHabit, UpdateHabitRequest, UpdateTodoRequest, User,
};

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// users

pub async fn find_user(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, email, is_paid, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, email, is_paid, created_at FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
}

/// Returns the user registered under `email`, creating it when missing.
pub async fn ensure_user(db: &SqlitePool, email: &str) -> Result<User, sqlx::Error> {
    if let Some(user) = find_user_by_email(db, email).await? {
        return Ok(user);
    }

    let id = Uuid::new_v4().to_string();
    let created_at = now();
    sqlx::query("INSERT INTO users (id, email, is_paid, created_at) VALUES (?1, ?2, 0, ?3)")
        .bind(&id)
        .bind(email)
        .bind(&created_at)
        .execute(db)
        .await?;

    Ok(User {
        id,
        email: email.to_string(),
        is_paid: false,
        created_at,
    })
}

/// Sets the paid flag for the user with `email`. Returns false when no such
/// user exists.
pub async fn set_user_paid(db: &SqlitePool, email: &str, is_paid: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_paid = ?1 WHERE email = ?2")
        .bind(is_paid)
        .bind(email)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// habits

pub async fn fetch_habits(db: &SqlitePool, user_id: &str) -> Result<Vec<Habit>, sqlx::Error> {
    sqlx::query_as::<_, Habit>(
        r#"
        SELECT id, user_id, title, environment, goal_count, created_at
        FROM habits
        WHERE user_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_habit(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Habit>, sqlx::Error> {
    sqlx::query_as::<_, Habit>(
        "SELECT id, user_id, title, environment, goal_count, created_at FROM habits WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Inserts a habit unless the user already owns `limit` of them. The count
/// and the insert are one statement, so concurrent creates cannot overshoot.
/// Returns `None` when the limit is reached.
pub async fn insert_habit(
    db: &SqlitePool,
    user_id: &str,
    req: NewHabitRequest,
    limit: usize,
) -> Result<Option<Habit>, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let created_at = now();
    let goal_count = req.goal_count.unwrap_or(1).max(1);

    let inserted = sqlx::query(
        r#"
        INSERT INTO habits (id, user_id, title, environment, goal_count, created_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6
        WHERE (SELECT COUNT(*) FROM habits WHERE user_id = ?2) < ?7
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.title)
    .bind(&req.environment)
    .bind(goal_count)
    .bind(&created_at)
    .bind(limit as i64)
    .execute(db)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(None);
    }

    Ok(Some(Habit {
        id,
        user_id: user_id.to_string(),
        title: req.title,
        environment: req.environment,
        goal_count,
        created_at,
    }))
}

pub async fn update_habit(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
    req: &UpdateHabitRequest,
) -> Result<Option<Habit>, sqlx::Error> {
    let mut current = match find_habit(db, user_id, id).await? {
        Some(h) => h,
        None => return Ok(None),
    };

    req.apply_to(&mut current);

    sqlx::query(
        r#"
        UPDATE habits
        SET title = ?1,
            environment = ?2,
            goal_count = ?3
        WHERE id = ?4 AND user_id = ?5
        "#,
    )
    .bind(&current.title)
    .bind(&current.environment)
    .bind(current.goal_count)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_habit(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query("DELETE FROM habits WHERE id = ?1 AND user_id = ?2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted > 0 {
        sqlx::query("DELETE FROM habit_logs WHERE habit_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(deleted > 0)
}

/// Records the status of `habit` on `day`, replacing any earlier entry for
/// that day.
pub async fn track_habit(
    db: &SqlitePool,
    habit: &Habit,
    day: NaiveDate,
    req: &TrackHabitRequest,
) -> Result<TrackedHabit, sqlx::Error> {
    let completed_count = req
        .completed_count
        .unwrap_or(if req.status == HabitStatus::Completed {
            habit.goal_count
        } else {
            0
        })
        .clamp(0, habit.goal_count);
    let date = stats::format_day(day);
    let updated_at = now();

    sqlx::query(
        r#"
        INSERT INTO habit_logs (id, habit_id, date, status, completed_count, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(habit_id, date) DO UPDATE SET
            status = excluded.status,
            completed_count = excluded.completed_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&habit.id)
    .bind(&date)
    .bind(req.status.as_str())
    .bind(completed_count)
    .bind(&updated_at)
    .execute(db)
    .await?;

    Ok(TrackedHabit {
        habit_id: habit.id.clone(),
        date,
        status: req.status,
        completed_count,
        updated_at,
    })
}

pub async fn fetch_habits_for_day(
    db: &SqlitePool,
    user_id: &str,
    day: NaiveDate,
) -> Result<Vec<HabitWithStats>, sqlx::Error> {
    let habits = fetch_habits(db, user_id).await?;

    let rows = sqlx::query_as::<_, HabitLogRow>(
        r#"
        SELECT l.habit_id, l.date, l.status, l.completed_count
        FROM habit_logs l
        JOIN habits h ON h.id = l.habit_id
        WHERE h.user_id = ?1 AND l.date <= ?2
        ORDER BY l.date ASC
        "#,
    )
    .bind(user_id)
    .bind(stats::format_day(day))
    .fetch_all(db)
    .await?;

    let mut logs_by_habit: HashMap<String, Vec<HabitLogRow>> = HashMap::new();
    for row in rows {
        logs_by_habit.entry(row.habit_id.clone()).or_default().push(row);
    }

    Ok(habits
        .into_iter()
        .map(|habit| {
            let logs = logs_by_habit.remove(&habit.id).unwrap_or_default();
            stats::habit_for_day(habit, &logs, day)
        })
        .collect())
}

// todos

const TODO_COLUMNS: &str =
    "id, user_id, title, description, priority, is_completed, created_at, updated_at";

pub async fn fetch_todos(db: &SqlitePool, user_id: &str) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? ORDER BY priority ASC, created_at ASC, rowid ASC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_todo(db: &SqlitePool, user_id: &str, id: &str) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_todo(
    db: &SqlitePool,
    user_id: &str,
    req: NewTodoRequest,
) -> Result<Todo, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now();
    let priority = req.priority.unwrap_or_default();
    let title = req.title_or_default();

    sqlx::query(
        r#"
        INSERT INTO todos
            (id, user_id, title, description, priority, is_completed, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&title)
    .bind(&req.description)
    .bind(priority.as_str())
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Todo {
        id,
        user_id: user_id.to_string(),
        title,
        description: req.description,
        priority,
        is_completed: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn update_todo(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
    req: &UpdateTodoRequest,
) -> Result<Option<Todo>, sqlx::Error> {
    let mut current = match find_todo(db, user_id, id).await? {
        Some(t) => t,
        None => return Ok(None),
    };

    req.apply_to(&mut current);
    current.updated_at = now();

    sqlx::query(
        r#"
        UPDATE todos
        SET title = ?1,
            description = ?2,
            priority = ?3,
            is_completed = ?4,
            updated_at = ?5
        WHERE id = ?6 AND user_id = ?7
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.priority.as_str())
    .bind(current.is_completed)
    .bind(&current.updated_at)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn mark_todo_complete(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Todo>, sqlx::Error> {
    let req = UpdateTodoRequest {
        is_completed: Some(true),
        ..UpdateTodoRequest::default()
    };
    update_todo(db, user_id, id, &req).await
}

pub async fn delete_todo(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ?1 AND user_id = ?2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
