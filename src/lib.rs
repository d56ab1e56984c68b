pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    crate::infra::store::SubscriberStore,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    std::{sync::Arc, time::Duration},
    tower_http::timeout::TimeoutLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubscriberStore>,
    pub webhook_secret: Option<Arc<str>>,
}

pub fn router(state: AppState, expose_diagnostics: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/health", get(adapters::webhook::health_handler))
        .route(
            "/api/webhook/cakto",
            post(adapters::webhook::cakto_webhook_handler),
        );

    if expose_diagnostics {
        app = app.route(
            "/api/webhook/diagnostics",
            get(adapters::webhook::diagnostics_handler),
        );
    }

    app.layer(DefaultBodyLimit::max(64 * 1024)) // Cakto payloads are small JSON
        .layer(TimeoutLayer::new(Duration::from_secs(15)))
        .with_state(state)
}
