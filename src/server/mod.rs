//! HTTP surface of the gateway.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::auth::CredentialResolver;
use crate::consts::{MAX_BODY_BYTES, MODULE_NAME};
use crate::error::EnhanceError;
use crate::gateway::{EnhancementRequest, EnhancementResult, Gateway};

/// State shared by every handler. Both parts are immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub credentials: Arc<CredentialResolver>,
}

impl AppState {
    pub fn new(gateway: Gateway, credentials: CredentialResolver) -> Self {
        Self {
            gateway: Arc::new(gateway),
            credentials: Arc::new(credentials),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/enhance", post(enhance))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("server error")
}

/// POST /api/enhance
///
/// The body is parsed as JSON whatever its `Content-Type` says. Validation
/// order matters: a missing image is reported before a missing credential,
/// and neither reaches the provider.
async fn enhance(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EnhancementResult>, EnhanceError> {
    let body = body.map_err(|rejection| {
        debug!(%rejection, "rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            EnhanceError::PayloadTooLarge
        } else {
            EnhanceError::InvalidBody
        }
    })?;
    let request: EnhancementRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "request body is not valid JSON");
        EnhanceError::InvalidBody
    })?;

    let image = request.image().ok_or(EnhanceError::MissingImage)?;

    let Some(token) = state.credentials.resolve() else {
        error!("no provider token configured");
        return Err(EnhanceError::MissingCredential);
    };
    debug!(source = %token.source, "resolved provider token");

    match state.gateway.enhance(image, &token.token).await {
        Ok(enhanced_url) => Ok(Json(EnhancementResult::Enhanced { enhanced_url })),
        Err(e) => {
            error!(error = %e, status = %e.status_code(), "enhancement failed");
            Err(e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: MODULE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
