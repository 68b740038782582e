use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shortest base64 payload we accept as plausibly an image.
pub const MIN_IMAGE_PAYLOAD_LEN: usize = 100;
/// Shortest receipt text worth sending to the analysis service.
pub const MIN_RECEIPT_TEXT_LEN: usize = 10;

pub fn default_language() -> String {
    "bg".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptImageRequest {
    #[serde(default)]
    pub image_base64: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl ReceiptImageRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image_base64.is_empty() {
            return Err(ApiError::Validation("No image data provided".into()));
        }
        if self.image_base64.len() < MIN_IMAGE_PAYLOAD_LEN {
            return Err(ApiError::Validation("Invalid image data: Too short".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptTextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl ReceiptTextRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::Validation("No receipt text provided".into()));
        }
        if self.text.trim().len() < MIN_RECEIPT_TEXT_LEN {
            return Err(ApiError::Validation(
                "Receipt text too short to analyze".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCheckResponse {
    pub is_valid: bool,
    pub message: String,
}
