//! A stand-in for the Replicate predictions API, served on a local port.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const TOKEN: &str = "r8_test";
pub const PREDICTION_ID: &str = "p-123";
pub const RESULT_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nrestored";

#[derive(Clone, Copy)]
pub enum Outcome {
    Succeed,
    Fail,
}

pub struct FakeReplicate {
    pub base_url: String,
    state: Arc<FakeState>,
}

struct FakeState {
    base_url: String,
    processing_polls: usize,
    outcome: Outcome,
    polls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

impl FakeReplicate {
    /// Reports `processing` for `processing_polls` reads, then settles.
    pub async fn start(processing_polls: usize, outcome: Outcome) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(FakeState {
            base_url: base_url.clone(),
            processing_polls,
            outcome,
            polls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/predictions", post(create))
            .route("/v1/predictions/{id}", get(read))
            .route("/files/out.png", get(file))
            .with_state(state.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self { base_url, state }
    }

    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.state.bodies.lock().unwrap().clone()
    }

    pub fn output_url(&self) -> String {
        format!("{}/files/out.png", self.base_url)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthenticated() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "title": "Unauthenticated",
            "detail": "You did not pass a valid authentication token"
        })),
    )
        .into_response()
}

async fn create(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    state.bodies.lock().unwrap().push(body);
    (
        StatusCode::CREATED,
        Json(json!({"id": PREDICTION_ID, "status": "starting", "output": null, "error": null})),
    )
        .into_response()
}

async fn read(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    if id != PREDICTION_ID {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    let n = state.polls.fetch_add(1, Ordering::SeqCst);
    let body = if n < state.processing_polls {
        json!({"id": id, "status": "processing", "output": null, "error": null})
    } else {
        match state.outcome {
            Outcome::Succeed => json!({
                "id": id,
                "status": "succeeded",
                "output": format!("{}/files/out.png", state.base_url),
                "error": null,
            }),
            Outcome::Fail => json!({
                "id": id,
                "status": "failed",
                "output": null,
                "error": "bad input",
            }),
        }
    };
    Json(body).into_response()
}

async fn file() -> impl IntoResponse {
    ([("content-type", "image/png")], RESULT_BYTES)
}
