use {
    cakto_sync::{
        AppState,
        config::Config,
        infra::{memory::MemoryStore, postgres::PgStore, store::SubscriberStore},
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::signal,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    if config.webhook_secret.as_deref().is_none_or(str::is_empty) {
        tracing::warn!(
            "CAKTO_WEBHOOK_SECRET is missing or empty — every delivery will fail with 500 \
             until it is configured"
        );
    }

    let store: Arc<dyn SubscriberStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .acquire_timeout(Duration::from_secs(3))
                .connect(url)
                .await
                .expect("failed to connect to database");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("failed to run migrations");
            Arc::new(PgStore::new(pool, config.store_timeout))
        }
        None => {
            tracing::warn!("DATABASE_URL not set — using the in-memory store (development only)");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState {
        store,
        webhook_secret: config.webhook_secret.clone(),
    };

    let app = cakto_sync::router(state, config.expose_diagnostics);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
