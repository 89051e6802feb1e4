use std::sync::Arc;

use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub webhook_secret: Arc<str>,
}

impl AppState {
    pub fn new(db: SqlitePool, webhook_secret: impl Into<Arc<str>>) -> Self {
        Self {
            db,
            webhook_secret: webhook_secret.into(),
        }
    }
}
