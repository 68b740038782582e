use axum::{extract::State, response::Json as AxumJson};

use crate::error::ApiError;
use crate::schema::{AnalysisResponse, KeyCheckResponse, ReceiptTextRequest};
use crate::store::NewReceipt;
use crate::AppState;

/// POST /api/analyze-receipt — send receipt text to the analysis service
/// and record the result. Persistence is best-effort telemetry: a storage
/// failure is logged and the response is unaffected.
pub async fn analyze_receipt(
    State(state): State<AppState>,
    AxumJson(req): AxumJson<ReceiptTextRequest>,
) -> Result<AxumJson<AnalysisResponse>, ApiError> {
    req.validate()?;

    // Configuration problems are caught before any external call.
    if !state.analysis.has_credential() {
        return Err(ApiError::Configuration(
            "OpenAI API key is not configured. Set OPENAI_API_KEY and restart.".into(),
        ));
    }

    let analysis_result = state.analysis.analyze(&req.text).await?;

    match state.store.create(NewReceipt {
        image_url: None,
        ocr_text: Some(req.text.clone()),
        language: req.language.clone(),
        analysis_result: Some(analysis_result.clone()),
    }) {
        Ok(receipt) => tracing::info!(receipt_id = receipt.id, "receipt record stored"),
        Err(e) => tracing::error!("failed to store receipt record: {}", e),
    }

    Ok(AxumJson(AnalysisResponse {
        text: analysis_result,
    }))
}

/// GET /api/check-openai-key — diagnostic for the configured credential.
pub async fn check_openai_key(State(state): State<AppState>) -> AxumJson<KeyCheckResponse> {
    let (is_valid, message) = state.analysis.check_key().await;
    AxumJson(KeyCheckResponse { is_valid, message })
}
