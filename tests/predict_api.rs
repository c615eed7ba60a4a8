use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use llm_predict_service::engine::mock::FAIL_MARKER;
use llm_predict_service::{AppConfig, MockEngine, RequestSerializer, build_router};

fn test_config() -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        models_dir: "models".into(),
        model_file: "test.gguf".into(),
        tokenizer_path: "models/tokenizer.json".into(),
        temperature: 0.05,
        max_tokens: 5,
        queue_capacity: 8,
    }
}

/// Router backed by a mock engine, plus a view of every prompt it saw.
fn test_app() -> (Router, Arc<Mutex<Vec<String>>>) {
    let engine = MockEngine::new();
    let calls = engine.calls();
    let serializer = Arc::new(RequestSerializer::spawn(Box::new(engine), 8).unwrap());
    let router = build_router(Arc::new(test_config()), serializer);
    (router, calls)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_text_mode_passes_query_through() {
    let (app, calls) = test_app();
    let resp = app.oneshot(get("/predict?mode=text&q=hello")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "got {content_type}");
    assert_eq!(body_string(resp).await, "completion[5tok]:hello");

    // The identity template: the prompt is the raw query.
    assert_eq!(*calls.lock(), vec!["hello"]);
}

#[tokio::test]
async fn get_ques_mode_applies_template() {
    let (app, calls) = test_app();
    let resp = app
        .oneshot(get("/predict?mode=ques&q=What%20is%202%2B2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*calls.lock(), vec!["Q: What is 2+2\n\nA: "]);
}

#[tokio::test]
async fn missing_mode_defaults_to_text() {
    let (app, calls) = test_app();
    let resp = app.oneshot(get("/predict?q=hello")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*calls.lock(), vec!["hello"]);
}

#[tokio::test]
async fn post_body_takes_precedence_over_q_parameter() {
    let (app, calls) = test_app();
    let resp = app
        .oneshot(post("/predict?mode=text&q=from-param", "from body"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*calls.lock(), vec!["from body"]);
}

#[tokio::test]
async fn post_without_body_falls_back_to_q_parameter() {
    let (app, calls) = test_app();
    let resp = app
        .oneshot(post("/predict?mode=text&q=from-param", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*calls.lock(), vec!["from-param"]);
}

#[tokio::test]
async fn undecodable_body_falls_back_to_q_parameter() {
    let (app, calls) = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/predict?mode=text&q=fallback")
        .body(Body::from(vec![0xff, 0xfe, 0xfd]))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    // A body that cannot be read as text counts as absent, not as an error.
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "completion[5tok]:fallback");
    assert_eq!(*calls.lock(), vec!["fallback"]);
}

#[tokio::test]
async fn empty_request_is_rejected_before_generation() {
    let (app, calls) = test_app();
    let resp = app.oneshot(post("/predict", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("no query"));

    // The engine was never invoked.
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn unknown_mode_is_rejected_before_generation() {
    let (app, calls) = test_app();
    let resp = app.oneshot(get("/predict?mode=unknown&q=x")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("unknown mode"));

    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn generation_failure_maps_to_internal_error() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(post("/predict", &format!("boom {FAIL_MARKER}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("generation failed"));
}

#[tokio::test]
async fn identical_requests_get_identical_completions() {
    let (app, _) = test_app();

    let first = app
        .clone()
        .oneshot(get("/predict?mode=ques&q=repeat"))
        .await
        .unwrap();
    let second = app.oneshot(get("/predict?mode=ques&q=repeat")).await.unwrap();

    assert_eq!(body_string(first).await, body_string(second).await);
}
