#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use dailyboard::api::{auth::USER_HEADER, router};
use dailyboard::db;
use dailyboard::models::User;
use dailyboard::state::AppState;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const SECRET: &str = "test-webhook-secret";

pub async fn setup_db() -> SqlitePool {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

pub async fn setup() -> (SqlitePool, Router) {
    let pool = setup_db().await;
    let app = router(AppState::new(pool.clone(), SECRET));
    (pool, app)
}

pub async fn user(pool: &SqlitePool, email: &str) -> User {
    db::repository::ensure_user(pool, email)
        .await
        .expect("Failed to create user")
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&User>,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, &user.id);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub fn json<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).expect("Failed to parse response body")
}
