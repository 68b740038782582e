//! Receipt OCR and AI analysis service: a thin backend that extracts text
//! from photographed receipts and proxies it to an LLM for a categorized
//! line-item breakdown, plus the client-side controller driving both calls.

use std::sync::Arc;

pub mod analysis;
pub mod error;
pub mod ocr;
pub mod routes;
pub mod schema;
pub mod session;
pub mod store;

use analysis::AnalysisService;
use store::ReceiptStore;

/// Shared handles for the router. Built once at startup; tests construct
/// their own isolated instance.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReceiptStore>,
    pub analysis: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(store: Arc<ReceiptStore>, analysis: Arc<AnalysisService>) -> Self {
        AppState { store, analysis }
    }
}
