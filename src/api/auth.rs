use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::repository;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Set by the authentication layer in front of this service.
pub const USER_HEADER: &str = "x-user-id";

pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_HEADER} header")))?;

        let user = repository::find_user(&state.db, id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

        Ok(CurrentUser(user))
    }
}
