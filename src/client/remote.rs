use std::env;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::auth::USER_HEADER;
use crate::db::stats;
use crate::error::{ConfigError, ErrorResponse};
use crate::models::{
    Habit, HabitWithStats, NewHabitRequest, NewTodoRequest, Todo, TrackHabitRequest, TrackedHabit,
    UpdateHabitRequest, UpdateTodoRequest,
};

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The backend answered and refused the mutation.
    #[error("{0}")]
    Rejected(String),

    /// The call never produced an answer.
    #[error("network error: {0}")]
    Transport(String),
}

/// The authoritative entity mutation actions, consumed as async
/// request/response calls.
#[async_trait]
pub trait RemoteActions: Send + Sync {
    async fn fetch_habits_for_day(&self, day: NaiveDate) -> Result<Vec<HabitWithStats>, RemoteError>;
    async fn create_habit(&self, req: &NewHabitRequest) -> Result<Habit, RemoteError>;
    async fn update_habit(&self, habit_id: &str, req: &UpdateHabitRequest) -> Result<Habit, RemoteError>;
    async fn track_habit(&self, habit_id: &str, req: &TrackHabitRequest) -> Result<TrackedHabit, RemoteError>;
    async fn delete_habit(&self, habit_id: &str) -> Result<(), RemoteError>;
    async fn fetch_todos(&self) -> Result<Vec<Todo>, RemoteError>;
    async fn add_todo(&self, req: &NewTodoRequest) -> Result<Todo, RemoteError>;
    async fn update_todo(&self, todo_id: &str, req: &UpdateTodoRequest) -> Result<Todo, RemoteError>;
    async fn mark_todo_complete(&self, todo_id: &str) -> Result<Todo, RemoteError>;
    async fn delete_todo(&self, todo_id: &str) -> Result<(), RemoteError>;
}

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub user_id: String,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        }
    }

    pub fn new_from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("DAILYBOARD_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        let user_id =
            env::var("DAILYBOARD_USER_ID").map_err(|_| ConfigError::Missing("DAILYBOARD_USER_ID"))?;

        Ok(Self::new(base_url, user_id))
    }
}

/// [`RemoteActions`] over the HTTP API.
pub struct HttpRemote {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(USER_HEADER, &self.config.user_id)
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .authed(req)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| format!("{} {}", status, body));
        tracing::debug!("backend refused request: {} {}", status, message);
        Err(RemoteError::Rejected(message))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        self.send(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl RemoteActions for HttpRemote {
    async fn fetch_habits_for_day(&self, day: NaiveDate) -> Result<Vec<HabitWithStats>, RemoteError> {
        let url = self.url(&format!("/api/habits?date={}", stats::format_day(day)));
        self.send_json(self.client.get(url)).await
    }

    async fn create_habit(&self, req: &NewHabitRequest) -> Result<Habit, RemoteError> {
        self.send_json(self.client.post(self.url("/api/habits")).json(req))
            .await
    }

    async fn update_habit(&self, habit_id: &str, req: &UpdateHabitRequest) -> Result<Habit, RemoteError> {
        let url = self.url(&format!("/api/habits/{}", habit_id));
        self.send_json(self.client.patch(url).json(req)).await
    }

    async fn track_habit(&self, habit_id: &str, req: &TrackHabitRequest) -> Result<TrackedHabit, RemoteError> {
        let url = self.url(&format!("/api/habits/{}/track", habit_id));
        self.send_json(self.client.post(url).json(req)).await
    }

    async fn delete_habit(&self, habit_id: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("/api/habits/{}", habit_id));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn fetch_todos(&self) -> Result<Vec<Todo>, RemoteError> {
        self.send_json(self.client.get(self.url("/api/todos"))).await
    }

    async fn add_todo(&self, req: &NewTodoRequest) -> Result<Todo, RemoteError> {
        self.send_json(self.client.post(self.url("/api/todos")).json(req))
            .await
    }

    async fn update_todo(&self, todo_id: &str, req: &UpdateTodoRequest) -> Result<Todo, RemoteError> {
        let url = self.url(&format!("/api/todos/{}", todo_id));
        self.send_json(self.client.patch(url).json(req)).await
    }

    async fn mark_todo_complete(&self, todo_id: &str) -> Result<Todo, RemoteError> {
        let url = self.url(&format!("/api/todos/{}/complete", todo_id));
        self.send_json(self.client.post(url)).await
    }

    async fn delete_todo(&self, todo_id: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("/api/todos/{}", todo_id));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
