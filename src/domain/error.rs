use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Webhook secret is unset or empty — an operational problem,
    /// not a bad request. Must never be reported as a signature failure.
    #[error("webhook secret is not configured")]
    MisconfiguredSecret,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage: {0}")]
    Storage(String),
}
