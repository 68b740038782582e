//! Client-side controller: owns the transient pipeline state (image, OCR
//! text, analysis result) and sequences the two backend calls. The flow is
//! `empty → image-loaded → ocr-in-progress → text-ready →
//! analysis-in-progress → analyzed`; a failed call returns to the
//! pre-action state and leaves only an expiring status message behind.
//!
//! No request fencing: a call abandoned via `reset()` is not cancelled, so
//! its late response can still overwrite newer state.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::schema::{AnalysisResponse, OcrResponse};

pub mod progress;
pub mod status;

pub use progress::SimulatedProgress;
pub use status::{StatusCenter, StatusKind, StatusMessage};

/// Transient OCR state; replaced wholesale on each recognition or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrResult {
    pub text: String,
    pub language: String,
}

/// Transient analysis state; the timestamp is the client clock at the
/// moment the successful response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    ImageLoaded,
    OcrInProgress,
    TextReady,
    AnalysisInProgress,
    Analyzed,
}

pub struct SessionController {
    http: reqwest::Client,
    base_url: String,
    image_url: Option<String>,
    ocr_result: OcrResult,
    analysis_result: Option<AnalysisResult>,
    is_ocr_in_progress: bool,
    is_analysis_in_progress: bool,
    pub status: StatusCenter,
    pub progress: SimulatedProgress,
}

impl SessionController {
    pub fn new(base_url: impl Into<String>) -> Self {
        SessionController {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            image_url: None,
            ocr_result: OcrResult {
                text: String::new(),
                language: "bg".to_string(),
            },
            analysis_result: None,
            is_ocr_in_progress: false,
            is_analysis_in_progress: false,
            status: StatusCenter::new(),
            progress: SimulatedProgress::idle(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_analysis_in_progress {
            Phase::AnalysisInProgress
        } else if self.is_ocr_in_progress {
            Phase::OcrInProgress
        } else if self.analysis_result.is_some() {
            Phase::Analyzed
        } else if !self.ocr_result.text.trim().is_empty() {
            Phase::TextReady
        } else if self.image_url.is_some() {
            Phase::ImageLoaded
        } else {
            Phase::Empty
        }
    }

    pub fn ocr_result(&self) -> &OcrResult {
        &self.ocr_result
    }

    pub fn analysis_result(&self) -> Option<&AnalysisResult> {
        self.analysis_result.as_ref()
    }

    /// An image arrived from upload or camera capture.
    pub fn load_image(&mut self, data_url: impl Into<String>) {
        self.image_url = Some(data_url.into());
    }

    /// Explicit reset: drops the image and any recognized text.
    pub fn reset(&mut self) {
        self.image_url = None;
        self.ocr_result.text.clear();
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.ocr_result.language = language.into();
    }

    /// Manual edit of the recognized text.
    pub fn edit_text(&mut self, text: impl Into<String>) {
        self.ocr_result.text = text.into();
    }

    /// Run recognition on the loaded image. Guarded: needs an image and no
    /// call already in flight.
    pub async fn recognize(&mut self) -> Option<OcrResult> {
        let Some(image_url) = self.image_url.clone() else {
            self.status
                .show("Моля, първо качете изображение.", StatusKind::Warning);
            return None;
        };
        if self.is_ocr_in_progress || self.is_analysis_in_progress {
            return None;
        }

        self.is_ocr_in_progress = true;
        self.progress.start();

        let outcome = self
            .post_json(
                "/api/ocr",
                json!({
                    "imageBase64": image_url,
                    "language": self.ocr_result.language,
                }),
            )
            .await;

        self.is_ocr_in_progress = false;
        match outcome {
            Ok(body) => match serde_json::from_value::<OcrResponse>(body) {
                Ok(response) => {
                    self.progress.complete();
                    self.ocr_result = OcrResult {
                        text: response.text,
                        language: response.language,
                    };
                    self.status
                        .show("OCR обработката завърши успешно!", StatusKind::Success);
                    Some(self.ocr_result.clone())
                }
                Err(e) => {
                    self.progress.fail();
                    self.status.show(
                        format!("Грешка при OCR обработката: {}", e),
                        StatusKind::Error,
                    );
                    None
                }
            },
            Err(message) => {
                self.progress.fail();
                self.status.show(
                    format!("Грешка при OCR обработката: {}", message),
                    StatusKind::Error,
                );
                None
            }
        }
    }

    /// Send the (possibly hand-edited) text for analysis. Guarded: needs
    /// non-empty text and no call already in flight. A failure returns the
    /// controller to text-ready, not to an error state.
    pub async fn analyze(&mut self) -> Option<AnalysisResult> {
        if self.ocr_result.text.trim().is_empty() {
            self.status.show(
                "Моля, първо извършете OCR или въведете текст.",
                StatusKind::Warning,
            );
            return None;
        }
        if self.is_ocr_in_progress || self.is_analysis_in_progress {
            return None;
        }

        self.is_analysis_in_progress = true;
        let outcome = self
            .post_json(
                "/api/analyze-receipt",
                json!({
                    "text": self.ocr_result.text,
                    "language": self.ocr_result.language,
                }),
            )
            .await;
        self.is_analysis_in_progress = false;

        match outcome {
            Ok(body) => match serde_json::from_value::<AnalysisResponse>(body) {
                Ok(response) => {
                    let result = AnalysisResult {
                        text: response.text,
                        timestamp: Utc::now(),
                    };
                    self.analysis_result = Some(result.clone());
                    self.status
                        .show("AI анализът завърши успешно!", StatusKind::Success);
                    Some(result)
                }
                Err(e) => {
                    self.status
                        .show(format!("Грешка при анализа: {}", e), StatusKind::Error);
                    None
                }
            },
            Err(message) => {
                self.status
                    .show(format!("Грешка при анализа: {}", message), StatusKind::Error);
                None
            }
        }
    }

    /// POST a JSON body and return the JSON response, or the server's
    /// `{"error": ...}` message on a non-success status.
    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("invalid response: {}", e))?;

        if status.is_success() {
            Ok(value)
        } else {
            let message = value
                .get("error")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            Err(message)
        }
    }
}
