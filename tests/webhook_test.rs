mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use dailyboard::db::repository;
use dailyboard::webhook::payload::EventName;
use dailyboard::webhook::{SIGNATURE_HEADER, signature};
use serde_json::json;
use sqlx::SqlitePool;
use tower::ServiceExt;

use common::{SECRET, setup, user};

fn payload(event: &str, email: Option<&str>) -> String {
    let mut attributes = json!({ "status": "active" });
    if let Some(email) = email {
        attributes["customer_email"] = json!(email);
    }
    json!({
        "meta": { "event_name": event, "test_mode": true },
        "data": { "id": "1", "type": "subscriptions", "attributes": attributes }
    })
    .to_string()
}

async fn post(app: &Router, body: String, signature: Option<String>) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/lemon")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn sign(body: &str) -> Option<String> {
    signature::sign(SECRET.as_bytes(), body.as_bytes())
}

async fn is_paid(pool: &SqlitePool, email: &str) -> bool {
    repository::find_user_by_email(pool, email)
        .await
        .unwrap()
        .expect("user should exist")
        .is_paid
}

#[tokio::test]
async fn test_valid_event_marks_user_paid() {
    let (pool, app) = setup().await;
    user(&pool, "buyer@example.com").await;

    let body = payload("subscription_created", Some("buyer@example.com"));
    let (status, text) = post(&app, body.clone(), sign(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.is_empty());
    assert!(is_paid(&pool, "buyer@example.com").await);
}

#[tokio::test]
async fn test_tampered_body_is_rejected_without_mutation() {
    let (pool, app) = setup().await;
    user(&pool, "buyer@example.com").await;

    let body = payload("order_created", Some("buyer@example.com"));
    let signature = sign(&body);
    let tampered = body.replace("buyer@", "buyer@@");

    let (status, text) = post(&app, tampered, signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "Invalid signature.");
    assert!(!is_paid(&pool, "buyer@example.com").await);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let (pool, app) = setup().await;
    user(&pool, "buyer@example.com").await;

    let body = payload("order_created", Some("buyer@example.com"));
    let (status, _) = post(&app, body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!is_paid(&pool, "buyer@example.com").await);
}

#[tokio::test]
async fn test_unparseable_body_is_rejected() {
    let (_pool, app) = setup().await;

    let body = "{not json".to_string();
    let (status, text) = post(&app, body.clone(), sign(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.starts_with("Webhook error:"));
}

#[tokio::test]
async fn test_missing_email_is_rejected() {
    let (_pool, app) = setup().await;

    let body = payload("order_created", None);
    let (status, text) = post(&app, body.clone(), sign(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("customer_email"));
}

#[tokio::test]
async fn test_unknown_event_is_rejected() {
    let (pool, app) = setup().await;
    user(&pool, "buyer@example.com").await;

    let body = payload("license_key_created", Some("buyer@example.com"));
    let (status, text) = post(&app, body.clone(), sign(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "Webhook error: Unhandled event: license_key_created");
    assert!(!is_paid(&pool, "buyer@example.com").await);
}

#[tokio::test]
async fn test_unknown_customer_is_rejected() {
    let (_pool, app) = setup().await;

    let body = payload("order_created", Some("stranger@example.com"));
    let (status, _) = post(&app, body.clone(), sign(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// Cancellation still grants access. This mirrors the provider integration as
// deployed and is almost certainly not the intended business rule.
#[tokio::test]
async fn test_cancellation_currently_marks_user_paid() {
    let (pool, app) = setup().await;
    user(&pool, "leaver@example.com").await;

    let body = payload("subscription_cancelled", Some("leaver@example.com"));
    let (status, _) = post(&app, body.clone(), sign(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(is_paid(&pool, "leaver@example.com").await);
}

#[tokio::test]
async fn test_every_known_event_is_accepted() {
    let (pool, app) = setup().await;
    user(&pool, "all@example.com").await;

    for event in EventName::ALL {
        repository::set_user_paid(&pool, "all@example.com", false)
            .await
            .unwrap();

        let body = payload(event.as_str(), Some("all@example.com"));
        let (status, text) = post(&app, body.clone(), sign(&body)).await;
        assert_eq!(status, StatusCode::OK, "{event}: {text}");
        assert!(is_paid(&pool, "all@example.com").await, "{event}");
    }
}
