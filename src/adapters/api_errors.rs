use crate::domain::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the adapter
/// layer and nowhere else. The processor only ever sees the status code and
/// a generic error code — no internal detail crosses the wire.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            PipelineError::InvalidSignature(reason) => {
                tracing::warn!(reason = %reason, "rejected delivery: bad signature");
                (StatusCode::UNAUTHORIZED, "invalid_signature")
            }
            PipelineError::MalformedPayload(reason) => {
                tracing::warn!(reason = %reason, "rejected delivery: malformed payload");
                (StatusCode::BAD_REQUEST, "malformed_payload")
            }
            PipelineError::MisconfiguredSecret => {
                tracing::error!("webhook secret missing or empty — check CAKTO_WEBHOOK_SECRET");
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            PipelineError::Database(err) => {
                tracing::error!("database error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            PipelineError::Storage(err) => {
                tracing::error!("storage error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = serde_json::json!({ "error_code": error_code });
        (status, Json(body)).into_response()
    }
}
