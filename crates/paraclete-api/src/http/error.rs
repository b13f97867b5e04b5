//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use paraclete_types::error::{ConverseError, PlanError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Conversation (`/ask`) errors.
    Converse(ConverseError),
    /// Plan generation (`/generate_plan`) errors.
    Plan(PlanError),
    /// Request body validation error.
    Validation(String),
}

impl From<ConverseError> for AppError {
    fn from(e: ConverseError) -> Self {
        AppError::Converse(e)
    }
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        AppError::Plan(e)
    }
}

/// Map an error to its HTTP status, machine-readable code, and message.
fn classify(err: &AppError) -> (StatusCode, &'static str, String) {
    match err {
        AppError::Converse(ConverseError::StoreUnavailable(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "STORE_UNAVAILABLE",
            e.to_string(),
        ),
        AppError::Converse(ConverseError::ConcurrencyExhausted { session_id, .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SESSION_BUSY",
            format!("Session '{session_id}' is receiving concurrent requests, retry shortly"),
        ),
        AppError::Converse(ConverseError::GenerationFailed(e)) => {
            (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", e.to_string())
        }
        AppError::Plan(PlanError::Generation(e)) => {
            (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", e.to_string())
        }
        AppError::Plan(PlanError::Render(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "RENDER_FAILED",
            e.to_string(),
        ),
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = classify(&self);

        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = json!({
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
