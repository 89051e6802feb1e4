//! Payment provider webhook: signature check, payload parsing and the
//! event-name dispatch that flips a user's paid flag.

pub mod payload;
pub mod signature;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::repository;
use crate::state::AppState;
use payload::{EventName, WebhookPayload};

pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid signature.")]
    InvalidSignature,

    #[error("Webhook error: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Webhook error: Missing customer_email in payload")]
    MissingEmail,

    #[error("Webhook error: Unhandled event: {0}")]
    UnhandledEvent(String),

    #[error("Webhook error: No user with email {0}")]
    UnknownUser(String),

    #[error("Webhook error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        warn!("webhook rejected: {}", self);
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::InvalidSignature)?;

    if !signature::verify(state.webhook_secret.as_bytes(), &body, signature) {
        return Err(WebhookError::InvalidSignature);
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)?;
    dispatch(&state.db, payload).await?;
    Ok(StatusCode::OK)
}

/// Applies a verified payload. Every recognised event marks the customer as
/// paid, including refunds, cancellations, expiries and failed payments.
pub async fn dispatch(db: &SqlitePool, payload: WebhookPayload) -> Result<EventName, WebhookError> {
    let email = payload
        .data
        .attributes
        .customer_email
        .filter(|e| !e.is_empty())
        .ok_or(WebhookError::MissingEmail)?;

    let event: EventName = payload
        .meta
        .event_name
        .parse()
        .map_err(WebhookError::UnhandledEvent)?;

    debug!(
        "webhook event {} (test_mode={}, id={:?}, status={:?})",
        event, payload.meta.test_mode, payload.data.id, payload.data.attributes.status
    );

    if event.looks_like_revocation() {
        warn!("{} for {} still marks the user as paid", event, email);
    }

    match event {
        EventName::OrderCreated | EventName::OrderRefunded => {
            mark_paid(db, &email).await?;
        }
        EventName::SubscriptionCreated
        | EventName::SubscriptionCancelled
        | EventName::SubscriptionResumed
        | EventName::SubscriptionExpired
        | EventName::SubscriptionPaused
        | EventName::SubscriptionUnpaused
        | EventName::SubscriptionPaymentFailed
        | EventName::SubscriptionPaymentSuccess
        | EventName::SubscriptionPaymentRecovered => {
            mark_paid(db, &email).await?;
        }
    }

    info!("Subscription {} for user {}", event, email);
    Ok(event)
}

async fn mark_paid(db: &SqlitePool, email: &str) -> Result<(), WebhookError> {
    if repository::set_user_paid(db, email, true).await? {
        Ok(())
    } else {
        Err(WebhookError::UnknownUser(email.to_string()))
    }
}
