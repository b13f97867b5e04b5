//! Financial plan handler for the REST API.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::{Instrument, info_span};

use paraclete_observe::genai_attrs;
use paraclete_types::plan::PlanRequest;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /generate_plan - Generate a financial plan PDF from profile fields.
///
/// The response streams the PDF bytes with a suggested download filename
/// derived from the session id.
pub async fn generate_plan(
    State(state): State<AppState>,
    Json(body): Json<PlanRequest>,
) -> Result<Response, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if body.session_id.trim().is_empty() {
        return Err(AppError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }

    let span = info_span!(
        "generate_plan",
        { genai_attrs::GEN_AI_OPERATION_NAME } = genai_attrs::OP_GENERATE_PLAN,
        session_id = %body.session_id,
    );
    let pdf = state
        .plan_service
        .generate_plan(&body)
        .instrument(span)
        .await?;

    let filename = format!("{}_financial_plan.pdf", body.session_id);
    let disposition = format!("attachment; filename=\"{filename}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
