use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use receipt_analyzer::analysis::AnalysisService;
use receipt_analyzer::routes::build_router;
use receipt_analyzer::session::{Phase, SessionController};
use receipt_analyzer::store::ReceiptStore;
use receipt_analyzer::AppState;

const CANNED_TABLE: &str = "Общо; ; 4.88\nХляб; BREAD; 1.99\nМлечни; MILK; 2.89";

fn test_state(analysis: AnalysisService) -> (AppState, Arc<ReceiptStore>) {
    let store = Arc::new(ReceiptStore::new());
    let state = AppState::new(Arc::clone(&store), Arc::new(analysis));
    (state, store)
}

fn image_payload() -> String {
    format!("data:image/png;base64,{}", "A".repeat(160))
}

async fn send_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// A local stand-in for the OpenAI API, selected via OPENAI_BASE_URL.
async fn spawn_mock_openai() -> SocketAddr {
    let app = Router::new()
        .route(
            "/chat/completions",
            post(|| async {
                Json(json!({
                    "id": "chatcmpl-test",
                    "object": "chat.completion",
                    "created": 0,
                    "choices": [{
                        "index": 0,
                        "message": { "role": "assistant", "content": CANNED_TABLE },
                        "finish_reason": "stop"
                    }]
                }))
            }),
        )
        .route("/models", get(|| async { Json(json!({ "data": [] })) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    addr
}

async fn spawn_throttling_openai() -> SocketAddr {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": { "message": "Rate limit reached for gpt-4o" } })),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    addr
}

#[tokio::test]
async fn ocr_endpoint_returns_text_and_echoes_the_language() {
    let (state, _) = test_state(AnalysisService::new(None, "http://127.0.0.1:1".into()));
    let (status, body) = send_json(
        build_router(state),
        "/api/ocr",
        json!({ "imageBase64": image_payload(), "language": "en" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["text"].as_str().expect("text field").is_empty());
    assert_eq!(body["language"], "en");
}

#[tokio::test]
async fn ocr_endpoint_rejects_a_missing_image() {
    let (state, _) = test_state(AnalysisService::new(None, "http://127.0.0.1:1".into()));
    let (status, body) = send_json(
        build_router(state),
        "/api/ocr",
        json!({ "language": "bg" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("image"));
}

#[tokio::test]
async fn ocr_endpoint_rejects_an_implausibly_short_payload() {
    let (state, _) = test_state(AnalysisService::new(None, "http://127.0.0.1:1".into()));
    let (status, body) = send_json(
        build_router(state),
        "/api/ocr",
        json!({ "imageBase64": "AAAA", "language": "bg" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("Too short"));
}

#[tokio::test]
async fn analyze_endpoint_rejects_short_text_before_any_call() {
    // An unroutable analysis URL: if the guard leaked, the request would
    // surface a connection error instead of the validation message.
    let (state, store) = test_state(AnalysisService::new(
        Some("test-key".into()),
        "http://127.0.0.1:1".into(),
    ));
    let (status, body) = send_json(
        build_router(state),
        "/api/analyze-receipt",
        json!({ "text": "x", "language": "bg" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("too short"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn analyze_endpoint_treats_a_missing_credential_as_configuration_error() {
    let (state, store) = test_state(AnalysisService::new(None, "http://127.0.0.1:1".into()));
    let (status, body) = send_json(
        build_router(state),
        "/api/analyze-receipt",
        json!({ "text": "BREAD 1.99\nMILK 2.89", "language": "en" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .expect("error")
        .contains("OPENAI_API_KEY"));
    assert!(store.is_empty(), "no record may be created on failure");
}

#[tokio::test]
async fn analyze_endpoint_stores_exactly_one_record_on_success() {
    let mock = spawn_mock_openai().await;
    let (state, store) = test_state(AnalysisService::new(
        Some("test-key".into()),
        format!("http://{}", mock),
    ));

    let (status, body) = send_json(
        build_router(state),
        "/api/analyze-receipt",
        json!({ "text": "BREAD 1.99\nMILK 2.89", "language": "en" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], CANNED_TABLE);

    let records = store.list();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.ocr_text.as_deref(), Some("BREAD 1.99\nMILK 2.89"));
    assert_eq!(record.language, "en");
    assert_eq!(record.analysis_result.as_deref(), Some(CANNED_TABLE));
    assert!(record.image_url.is_none());
}

#[tokio::test]
async fn analyze_endpoint_surfaces_upstream_throttling_as_429() {
    let mock = spawn_throttling_openai().await;
    let (state, store) = test_state(AnalysisService::new(
        Some("test-key".into()),
        format!("http://{}", mock),
    ));

    let (status, body) = send_json(
        build_router(state),
        "/api/analyze-receipt",
        json!({ "text": "BREAD 1.99\nMILK 2.89", "language": "en" }),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().expect("error").contains("Rate limit"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn key_check_reports_a_missing_credential() {
    let (state, _) = test_state(AnalysisService::new(None, "http://127.0.0.1:1".into()));
    let request = Request::builder()
        .method("GET")
        .uri("/api/check-openai-key")
        .body(Body::empty())
        .expect("request");
    let response = build_router(state).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(value["isValid"], false);
    assert!(!value["message"].as_str().expect("message").is_empty());
}

#[tokio::test]
async fn session_controller_drives_the_whole_pipeline() {
    let mock = spawn_mock_openai().await;
    let (state, store) = test_state(AnalysisService::new(
        Some("test-key".into()),
        format!("http://{}", mock),
    ));

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind app");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });

    let mut session = SessionController::new(format!("http://{}", addr));
    session.set_language("en");
    session.load_image(image_payload());
    assert_eq!(session.phase(), Phase::ImageLoaded);

    let ocr = session.recognize().await.expect("recognition result");
    assert!(!ocr.text.is_empty());
    assert_eq!(ocr.language, "en");
    assert_eq!(session.phase(), Phase::TextReady);
    assert_eq!(session.progress.percent(), 100);

    let analysis = session.analyze().await.expect("analysis result");
    assert_eq!(analysis.text, CANNED_TABLE);
    assert_eq!(session.phase(), Phase::Analyzed);

    // The backend stored the analyzed text as a side effect.
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.list()[0].ocr_text.as_deref(),
        Some(session.ocr_result().text.as_str())
    );
}
