use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson, Response},
};
use serde_json::json;

/// Error taxonomy for the HTTP surface. Storage errors are deliberately
/// absent: persistence is best-effort and never reaches a response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing request fields. User-correctable.
    #[error("{0}")]
    Validation(String),
    /// A required credential is absent. Operator-correctable, detected
    /// before any external call.
    #[error("{0}")]
    Configuration(String),
    /// The upstream service is throttling us.
    #[error("{0}")]
    RateLimited(String),
    /// The recognition or analysis backend failed or returned an unusable
    /// result.
    #[error("{0}")]
    Upstream(String),
}

impl From<crate::analysis::AnalysisError> for ApiError {
    fn from(err: crate::analysis::AnalysisError) -> Self {
        use crate::analysis::AnalysisError::*;
        match err {
            MissingCredential | InvalidCredential(_) => ApiError::Configuration(err.to_string()),
            RateLimited(_) => ApiError::RateLimited(err.to_string()),
            InputTooLong(_) | Upstream(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Configuration(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, AxumJson(json!({ "error": self.to_string() }))).into_response()
    }
}
