//! Conversation handler for the REST API.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for POST /ask.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub session_id: String,
    pub question: String,
}

/// Response body for POST /ask.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub response: String,
}

/// POST /ask - Answer a question in the context of the session transcript.
pub async fn ask(
    State(state): State<AppState>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if body.session_id.trim().is_empty() {
        return Err(AppError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }
    if body.question.trim().is_empty() {
        return Err(AppError::Validation(
            "question must not be empty".to_string(),
        ));
    }

    let answer = state
        .session_manager
        .converse(&body.session_id, &body.question)
        .await?;

    Ok(Json(AskResponse { response: answer }))
}
