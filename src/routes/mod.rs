use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub mod analyze;
pub mod ocr;

/// API router over an explicit state handle, so tests can mount an
/// isolated store/service instance per run.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ocr", post(ocr::ocr_receipt))
        .route("/api/analyze-receipt", post(analyze::analyze_receipt))
        .route("/api/check-openai-key", get(analyze::check_openai_key))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
