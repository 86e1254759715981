use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

use oldnew::auth::{CredentialResolver, TokenSource};
use oldnew::gateway::{Gateway, PollConfig};
use oldnew::provider::mock::{self, MockProvider};
use oldnew::provider::{EnhanceParams, JobStatus};
use oldnew::server::{AppState, build_router};

const PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

fn with_token() -> CredentialResolver {
    CredentialResolver::new(vec![TokenSource::Explicit("r8_test".to_string())])
}

fn without_token() -> CredentialResolver {
    CredentialResolver::new(vec![])
}

fn app(provider: Arc<MockProvider>, credentials: CredentialResolver) -> axum::Router {
    let gateway = Gateway::new(provider, EnhanceParams::default(), PollConfig::default());
    build_router(AppState::new(gateway, credentials))
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/enhance")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_module() {
    let app = app(Arc::new(MockProvider::new(vec![])), without_token());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "oldnew");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_image_is_400_and_provider_untouched() {
    for body in [r#"{}"#, r#"{"image": null}"#, r#"{"image": ""}"#] {
        let provider = Arc::new(MockProvider::new(vec![]));
        let (status, json) = send(app(provider.clone(), with_token()), post_json(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(json, json!({"error": "No image provided"}));
        assert_eq!(provider.submissions(), 0);
        assert_eq!(provider.status_fetches(), 0);
    }
}

#[tokio::test]
async fn missing_image_wins_over_missing_token() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let (status, _) = send(app(provider, without_token()), post_json("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_token_is_500_and_provider_untouched() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let body = json!({ "image": PHOTO }).to_string();
    let (status, json) = send(app(provider.clone(), without_token()), post_json(&body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": "REPLICATE_API_TOKEN not configured"}));
    assert_eq!(provider.submissions(), 0);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let (status, json) = send(app(provider.clone(), with_token()), post_json("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid JSON body");
    assert_eq!(provider.submissions(), 0);
}

#[tokio::test(start_paused = true)]
async fn success_returns_enhanced_url() {
    let provider = Arc::new(MockProvider::new(vec![mock::succeeded(json!(
        "https://example/out.png"
    ))]));
    let body = json!({ "image": PHOTO }).to_string();
    let (status, json) = send(app(provider.clone(), with_token()), post_json(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"enhancedUrl": "https://example/out.png"}));
    assert_eq!(provider.inputs()[0].image, PHOTO);
}

#[tokio::test(start_paused = true)]
async fn processing_then_success_polls_twice() {
    let provider = Arc::new(MockProvider::new(vec![
        mock::in_state(JobStatus::Processing),
        mock::succeeded(json!("https://example/out.png")),
    ]));
    let body = json!({ "image": PHOTO }).to_string();
    let (status, _) = send(app(provider.clone(), with_token()), post_json(&body)).await;

    assert_eq!(status, StatusCode::OK);
    let times = provider.poll_times();
    assert_eq!(times.len(), 2);
    assert_eq!(times[1] - times[0], Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn failed_job_is_500_with_provider_message() {
    let provider = Arc::new(MockProvider::new(vec![mock::failed(json!("bad input"))]));
    let body = json!({ "image": PHOTO }).to_string();
    let (status, json) = send(app(provider, with_token()), post_json(&body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": "bad input"}));
}

#[tokio::test(start_paused = true)]
async fn invalid_output_is_500() {
    for output in [json!(""), json!(7), json!({"url": "x"})] {
        let provider = Arc::new(MockProvider::new(vec![mock::succeeded(output)]));
        let body = json!({ "image": PHOTO }).to_string();
        let (status, json) = send(app(provider, with_token()), post_json(&body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Invalid output from provider."}));
    }
}

#[tokio::test(start_paused = true)]
async fn stuck_job_times_out_with_504() {
    let provider = Arc::new(MockProvider::stuck(JobStatus::Processing));
    let gateway = Gateway::new(
        provider.clone(),
        EnhanceParams::default(),
        PollConfig {
            max_polls: 4,
            ..PollConfig::default()
        },
    );
    let app = build_router(AppState::new(gateway, with_token()));
    let body = json!({ "image": PHOTO }).to_string();
    let (status, json) = send(app, post_json(&body)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"], "Enhancement timed out after 4 status checks");
    assert_eq!(provider.status_fetches(), 4);
}

#[tokio::test]
async fn body_without_content_type_is_still_parsed() {
    let provider = Arc::new(MockProvider::new(vec![mock::succeeded(json!(
        "https://example/out.png"
    ))]));
    let request = Request::builder()
        .method("POST")
        .uri("/api/enhance")
        .body(Body::from(json!({ "image": PHOTO }).to_string()))
        .unwrap();
    let (status, json) = send(app(provider.clone(), with_token()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"enhancedUrl": "https://example/out.png"}));
    assert_eq!(provider.submissions(), 1);
}

#[tokio::test]
async fn transport_error_is_500() {
    let provider = Arc::new(MockProvider::rejecting("connection reset"));
    let body = json!({ "image": PHOTO }).to_string();
    let (status, json) = send(app(provider, with_token()), post_json(&body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": "connection reset"}));
}

#[tokio::test]
async fn oversized_body_is_413() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let huge = "A".repeat(oldnew::consts::MAX_BODY_BYTES + 1);
    let body = json!({ "image": format!("data:image/png;base64,{huge}") }).to_string();
    let (status, json) = send(app(provider.clone(), with_token()), post_json(&body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"], "Image too large");
    assert_eq!(provider.submissions(), 0);
}
