#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use cakto_sync::domain::event::{EventType, NormalizedEvent};
use cakto_sync::domain::id::{EventId, SubjectId};
use cakto_sync::infra::memory::MemoryStore;
use cakto_sync::{AppState, router};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "cakto_test_secret_2025";

/// Sign a body the way Cakto does: `sha256=<hex>` of HMAC-SHA256.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
}

pub fn test_app() -> TestApp {
    test_app_with(Some(SECRET), false)
}

pub fn test_app_with(secret: Option<&str>, expose_diagnostics: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        webhook_secret: secret.map(Arc::from),
    };
    TestApp {
        app: router(state, expose_diagnostics),
        store,
    }
}

/// POST a body with an explicit (possibly absent) signature header and
/// return status plus parsed JSON body.
pub async fn post_webhook(
    app: &Router,
    body: &str,
    signature: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/webhook/cakto")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        request = request.header("X-Cakto-Signature", sig);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// POST a body signed with the test secret.
pub async fn post_signed(app: &Router, body: &str) -> (StatusCode, serde_json::Value) {
    let sig = sign(SECRET, body.as_bytes());
    post_webhook(app, body, Some(&sig)).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Build a normalized event directly, for store-level tests.
pub fn make_event(event_id: &str, event_type: &str, subject_id: &str) -> NormalizedEvent {
    NormalizedEvent {
        event_id: EventId::new(event_id).unwrap(),
        event_type: EventType::parse(event_type),
        subject_id: SubjectId::new(subject_id).unwrap(),
        occurred_at: Utc::now(),
        payload: serde_json::json!({
            "eventId": event_id,
            "eventType": event_type,
            "subjectId": subject_id,
        }),
    }
}
