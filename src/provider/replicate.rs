use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::consts::{DEFAULT_PROVIDER_URL, MODEL_VERSION};
use crate::error::EnhanceError;

use super::{Job, JobInput, Provider};

const PREDICTIONS_PATH: &str = "/v1/predictions";

/// Per-call timeout. The poll loop has its own, longer deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Talks to the Replicate predictions API.
pub struct ReplicateProvider {
    client: reqwest::Client,
    base_url: String,
    version: String,
}

impl ReplicateProvider {
    pub fn new(base_url: Option<String>, version: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("oldnew/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        let base_url = base_url.unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.unwrap_or_else(|| MODEL_VERSION.to_string()),
        })
    }

    fn predictions_url(&self) -> String {
        format!("{}{}", self.base_url, PREDICTIONS_PATH)
    }

    fn prediction_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, PREDICTIONS_PATH, id)
    }

    async fn read_job(resp: reqwest::Response) -> Result<Job, EnhanceError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EnhanceError::Transport(format!(
                "Replicate API error ({}): {}",
                status,
                error_detail(&text)
            )));
        }
        Ok(resp.json::<Job>().await?)
    }
}

#[async_trait]
impl Provider for ReplicateProvider {
    async fn create_job(&self, token: &str, input: &JobInput) -> Result<Job, EnhanceError> {
        let body = CreateRequest {
            version: &self.version,
            input,
        };
        let resp = self
            .client
            .post(self.predictions_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::read_job(resp).await
    }

    async fn get_job(&self, token: &str, id: &str) -> Result<Job, EnhanceError> {
        let resp = self
            .client
            .get(self.prediction_url(id))
            .bearer_auth(token)
            .send()
            .await?;
        Self::read_job(resp).await
    }
}

/// Pull the human-readable part out of an error body (`{"detail": "..."}`),
/// falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail.or(b.title))
        .unwrap_or_else(|| body.trim().to_string())
}

// --- API types ---

#[derive(Serialize)]
struct CreateRequest<'a> {
    version: &'a str,
    input: &'a JobInput,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    title: Option<String>,
}
