use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored record of one analyzed receipt. Append-only: never updated or
/// deleted for the lifetime of the process.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: i64,
    pub image_url: Option<String>,
    pub ocr_text: Option<String>,
    pub language: String,
    pub analysis_result: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Insert shape; id and processed_at are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewReceipt {
    pub image_url: Option<String>,
    pub ocr_text: Option<String>,
    pub language: String,
    pub analysis_result: Option<String>,
}
