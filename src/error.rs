//! Failure taxonomy of the enhancement gateway and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::provider::JobStatus;

/// Everything that can go wrong between receiving an image and returning
/// the enhanced URL.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("No image provided")]
    MissingImage,

    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Image too large")]
    PayloadTooLarge,

    #[error("REPLICATE_API_TOKEN not configured")]
    MissingCredential,

    /// The job reached a failed (or canceled) terminal state.
    #[error("{0}")]
    JobFailed(String),

    #[error("Invalid output from provider.")]
    InvalidOutput,

    #[error("job {id} went from {from} back to {to}")]
    StatusRegressed {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Enhancement timed out after {polls} status checks")]
    TimedOut { polls: u32 },

    /// The provider could not be reached or answered garbage.
    #[error("{0}")]
    Transport(String),
}

impl EnhanceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImage | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::MissingCredential
            | Self::JobFailed(_)
            | Self::InvalidOutput
            | Self::StatusRegressed { .. }
            | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for EnhanceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl IntoResponse for EnhanceError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
