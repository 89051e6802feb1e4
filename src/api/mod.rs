pub mod auth;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;

use crate::db::{repository, stats};
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;
use crate::webhook;
use auth::CurrentUser;

#[derive(Deserialize)]
struct DayQueryParams {
    date: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", post(register_user))
        .route("/api/users/me", get(current_user))
        .route("/api/habits", get(list_habits_for_day).post(create_habit))
        .route("/api/habits/{id}", patch(update_habit).delete(delete_habit))
        .route("/api/habits/{id}/track", post(track_habit))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", patch(update_todo).delete(delete_todo))
        .route("/api/todos/{id}/complete", post(complete_todo))
        .route("/api/webhooks/lemon", post(webhook::handle))
        .with_state(state)
}

fn parse_day(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw {
        None => Ok(Local::now().date_naive()),
        Some(raw) => stats::parse_day(raw)
            .ok_or_else(|| AppError::BadRequest(format!("invalid date: {raw}"))),
    }
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<NewUserRequest>,
) -> Result<Json<User>, AppError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }
    let user = repository::ensure_user(&state.db, email).await?;
    Ok(Json(user))
}

async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    let habit_limit = user.habit_limit();
    Json(UserProfile { user, habit_limit })
}

async fn list_habits_for_day(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<DayQueryParams>,
) -> Result<Json<Vec<HabitWithStats>>, AppError> {
    let day = parse_day(params.date.as_deref())?;
    let habits = repository::fetch_habits_for_day(&state.db, &user.id, day).await?;
    Ok(Json(habits))
}

async fn create_habit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<NewHabitRequest>,
) -> Result<Json<Habit>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }

    let limit = user.habit_limit();
    let habit = repository::insert_habit(&state.db, &user.id, req, limit)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("habit limit reached ({limit}); upgrade to add more"))
        })?;
    info!("habit {} created for {}", habit.id, user.id);
    Ok(Json(habit))
}

async fn update_habit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateHabitRequest>,
) -> Result<Json<Habit>, AppError> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("title must not be blank".to_string()));
    }
    let habit = repository::update_habit(&state.db, &user.id, &id, &req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(habit))
}

async fn delete_habit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = repository::delete_habit(&state.db, &user.id, &id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn track_habit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<TrackHabitRequest>,
) -> Result<Json<TrackedHabit>, AppError> {
    let day = parse_day(Some(&req.date))?;
    let habit = repository::find_habit(&state.db, &user.id, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    let tracked = repository::track_habit(&state.db, &habit, day, &req).await?;
    Ok(Json(tracked))
}

async fn list_todos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = repository::fetch_todos(&state.db, &user.id).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<NewTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    let todo = repository::insert_todo(&state.db, &user.id, req).await?;
    Ok(Json(todo))
}

async fn update_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    let todo = repository::update_todo(&state.db, &user.id, &id, &req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(todo))
}

async fn complete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    let todo = repository::mark_todo_complete(&state.db, &user.id, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = repository::delete_todo(&state.db, &user.id, &id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
