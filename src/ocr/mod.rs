//! Recognition service: wraps the Tesseract engine behind the `ocr`
//! feature, with a stub that serves the per-language sample text when the
//! feature is off. This avoids linking to system libraries
//! (leptonica/tesseract) on machines where they're not installed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub mod preprocess;

/// Tagged recognition outcome. Engine failures are masked with a textual
/// stand-in to keep the pipeline non-blocking, but callers can still tell
/// a real read from the stand-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Text actually read from the photographed receipt.
    Recognized { text: String },
    /// Stand-in text: the engine failed or is not compiled in.
    Fallback { text: String },
}

impl RecognitionOutcome {
    pub fn text(&self) -> &str {
        match self {
            RecognitionOutcome::Recognized { text } | RecognitionOutcome::Fallback { text } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RecognitionOutcome::Fallback { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("invalid image payload: {0}")]
    InvalidPayload(String),
}

/// UI language tag -> Tesseract language identifier. Total over all inputs;
/// unknown tags get the Bulgarian default.
pub fn engine_language(tag: &str) -> &'static str {
    match tag {
        "bg" => "bul",
        "en" => "eng",
        "ru" => "rus",
        "de" => "deu",
        "fr" => "fra",
        _ => "bul",
    }
}

/// Accepts either a data URL (`data:image/<fmt>;base64,<payload>`) or raw
/// base64 and returns the decoded bytes.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, RecognitionError> {
    let encoded = match payload.find("base64,") {
        Some(idx) if payload.starts_with("data:") => &payload[idx + "base64,".len()..],
        _ => payload,
    };
    BASE64
        .decode(encoded.trim())
        .map_err(|e| RecognitionError::InvalidPayload(e.to_string()))
}

/// Run recognition on a base64/data-URL image. The payload must decode;
/// everything past that point is masked with fallback text on failure.
pub async fn recognize(
    image_base64: &str,
    language: &str,
) -> Result<RecognitionOutcome, RecognitionError> {
    let bytes = decode_image_payload(image_base64)?;
    tracing::info!(
        payload_len = image_base64.len(),
        language,
        "OCR request received"
    );
    Ok(engine::recognize_bytes(bytes, language).await)
}

#[cfg(feature = "ocr")]
mod engine {
    use super::{engine_language, fallback_text, RecognitionOutcome};
    use crate::ocr::preprocess;
    use leptess::LepTess;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub async fn recognize_bytes(bytes: Vec<u8>, language: &str) -> RecognitionOutcome {
        let lang = engine_language(language);
        // Pre-processing failures are non-fatal: recognize the original.
        let bytes = preprocess::prepare(&bytes).unwrap_or(bytes);

        let language = language.to_string();
        let result = tokio::task::spawn_blocking(move || run_engine(&bytes, lang)).await;
        match result {
            Ok(Ok(text)) => {
                tracing::info!("OCR processing completed");
                RecognitionOutcome::Recognized { text }
            }
            Ok(Err(e)) => {
                tracing::warn!("OCR engine failed, returning fallback text: {}", e);
                RecognitionOutcome::Fallback {
                    text: fallback_text(&language).to_string(),
                }
            }
            Err(e) => {
                tracing::warn!("OCR task failed, returning fallback text: {}", e);
                RecognitionOutcome::Fallback {
                    text: fallback_text(&language).to_string(),
                }
            }
        }
    }

    fn run_engine(bytes: &[u8], lang: &'static str) -> anyhow::Result<String> {
        // Tesseract wants a file; the temp file is deleted on drop.
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(bytes)?;

        let mut lt =
            LepTess::new(None, lang).map_err(|e| anyhow::anyhow!("tesseract init: {}", e))?;
        lt.set_image(tmp.path())
            .map_err(|e| anyhow::anyhow!("tesseract set image: {}", e))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| anyhow::anyhow!("tesseract run: {}", e))?;
        Ok(text)
    }
}

#[cfg(not(feature = "ocr"))]
mod engine {
    use super::{fallback_text, RecognitionOutcome};

    pub async fn recognize_bytes(_bytes: Vec<u8>, language: &str) -> RecognitionOutcome {
        tracing::warn!("OCR feature not enabled; returning fallback text");
        RecognitionOutcome::Fallback {
            text: fallback_text(language).to_string(),
        }
    }
}

/// Sample receipt text used when the engine cannot read the image. Callers
/// must not assume a non-empty result means the receipt was actually read.
pub fn fallback_text(language: &str) -> &'static str {
    match language {
        "bg" => {
            "КАСОВА БЕЛЕЖКА\nХИПЕРМАРКЕТ ФАНТАСТИКО\nСофия, бул. Черни връх 32\nЕИК: 123456789\nАРТИКУЛ                  ЦЕНА\n----------------------------\nХляб Добруджа             1.99\nПрясно мляко 3% 1л        2.89\nКисело мляко              1.25\nСирене БДС кг            12.50\nКашкавал                 16.90\nЯбълки                    3.50\nБанани                    3.20\nДомати                    4.80\n----------------------------\nОБЩО:                    47.03\nДДС 20%:                  7.84\nОбща сума:               47.03\n\nНачин на плащане: В брой\nДата: 28.03.2025 10:15:22\nБлагодарим Ви!"
        }
        "en" => {
            "RECEIPT\nSUPERMARKET FANTASTIKO\nSofia, 32 Cherni Vrah Blvd.\nVAT: BG123456789\nITEM                     PRICE\n----------------------------\nBread                     1.99\nMilk 3% 1L                2.89\nYogurt                    1.25\nWhite Cheese kg          12.50\nYellow Cheese            16.90\nApples                    3.50\nBananas                   3.20\nTomatoes                  4.80\n----------------------------\nTOTAL:                   47.03\nVAT 20%:                  7.84\nTotal amount:            47.03\n\nPayment method: Cash\nDate: 28.03.2025 10:15:22\nThank you!"
        }
        _ => {
            "RECEIPT\nSUPERMARKET FANTASTIKO\nSofia, 32 Cherni Vrah Blvd.\nID: 123456789\nITEM                     PRICE\n----------------------------\nBread                     1.99\nMilk 3% 1L                2.89\nYogurt                    1.25\nCheese kg                12.50\nYellow Cheese            16.90\nApples                    3.50\nBananas                   3.20\nTomatoes                  4.80\n----------------------------\nTOTAL:                   47.03\nVAT 20%:                  7.84\nTotal amount:            47.03\n\nPayment: Cash\nDate: 28.03.2025 10:15:22\nThank you!"
        }
    }
}
