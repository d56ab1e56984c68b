use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, signature::SIGNATURE_HEADER},
        domain::event::WebhookDelivery,
        services::pipeline,
    },
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::HeaderMap,
    },
    chrono::Utc,
    uuid::Uuid,
};

/// POST /api/webhook/cakto — the single ingestion endpoint.
///
/// Takes the body as raw bytes: the signature covers the exact wire bytes,
/// so any re-serialization before verification would break it.
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(
        delivery_id = tracing::field::Empty,
        event_id = tracing::field::Empty,
        event_type = tracing::field::Empty,
    )
)]
pub async fn cakto_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::Span::current().record(
        "delivery_id",
        tracing::field::display(Uuid::now_v7()),
    );

    let delivery = WebhookDelivery {
        body: body.to_vec(),
        signature: headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        received_at: Utc::now(),
    };

    let result = pipeline::ingest(
        state.store.as_ref(),
        state.webhook_secret.as_deref(),
        delivery,
    )
    .await?;

    Ok(Json(serde_json::json!({ "status": result.as_str() })))
}

/// GET /health — liveness probe.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "cakto_sync" }))
}

/// GET /api/webhook/diagnostics — development-only configuration check.
/// Mounted only when diagnostics are enabled; reports presence of the
/// secret and reachability of the store, never any secret material.
pub async fn diagnostics_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let secret_configured = state
        .webhook_secret
        .as_deref()
        .is_some_and(|s| !s.is_empty());
    let store_reachable = state.store.ping().await.is_ok();

    Json(serde_json::json!({
        "secret_configured": secret_configured,
        "store_reachable": store_reachable,
    }))
}
