use std::{env, sync::Arc, time::Duration};

/// All runtime configuration, resolved once at startup and passed in
/// explicitly — components never read the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` = variable unset; `Some("")` = set but empty. Both fail
    /// verification with a configuration error, but diagnostics can tell
    /// them apart.
    pub webhook_secret: Option<Arc<str>>,
    /// When unset the service falls back to the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    /// Mounts GET /api/webhook/diagnostics. Keep off outside development.
    pub expose_diagnostics: bool,
    /// Upper bound on any single store operation.
    pub store_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let store_timeout_secs = env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            webhook_secret: env::var("CAKTO_WEBHOOK_SECRET").ok().map(Arc::from),
            database_url: env::var("DATABASE_URL").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            expose_diagnostics: env::var("EXPOSE_DIAGNOSTICS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            store_timeout: Duration::from_secs(store_timeout_secs),
        }
    }
}
