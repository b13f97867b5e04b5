//! Axum router configuration with middleware.
//!
//! Middleware: CORS (permissive), request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/ask", post(handlers::ask::ask))
        .route("/generate_plan", post(handlers::plan::generate_plan))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / - Welcome message.
async fn welcome() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": "Welcome to Paraclete AI",
    }))
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
