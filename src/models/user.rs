use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const FREE_HABIT_LIMIT: usize = 2;
pub const PAID_HABIT_LIMIT: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub is_paid: bool,
    pub created_at: String,
}

impl User {
    pub fn habit_limit(&self) -> usize {
        habit_limit(self.is_paid)
    }
}

pub fn habit_limit(is_paid: bool) -> usize {
    if is_paid {
        PAID_HABIT_LIMIT
    } else {
        FREE_HABIT_LIMIT
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub habit_limit: usize,
}
