use axum::{extract::State, response::Json as AxumJson};

use crate::error::ApiError;
use crate::ocr;
use crate::schema::{OcrResponse, ReceiptImageRequest};
use crate::AppState;

/// POST /api/ocr — extract text from a base64/data-URL receipt image.
/// Validation failures never reach the recognition service.
pub async fn ocr_receipt(
    State(_state): State<AppState>,
    AxumJson(req): AxumJson<ReceiptImageRequest>,
) -> Result<AxumJson<OcrResponse>, ApiError> {
    req.validate()?;

    let outcome = ocr::recognize(&req.image_base64, &req.language)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to perform OCR: {}", e)))?;

    if outcome.is_fallback() {
        tracing::warn!(language = %req.language, "serving fallback OCR text");
    }

    Ok(AxumJson(OcrResponse {
        text: outcome.text().to_string(),
        language: req.language,
    }))
}
