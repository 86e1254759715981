//! Talks to a running gateway the way the comparison page does.

use anyhow::{Context, Result, anyhow, bail};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::gateway::{EnhancementRequest, EnhancementResult};
use crate::image;
use crate::session::{ComparisonSession, Phase};

/// The gateway keeps the request open while it polls, so this has to
/// outlast its deadline.
const ENHANCE_TIMEOUT: Duration = Duration::from_secs(330);

pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(ENHANCE_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the gateway to enhance an image; returns the result URL.
    pub async fn enhance(&self, image: &str) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/api/enhance", self.base_url))
            .json(&EnhancementRequest::new(image))
            .send()
            .await
            .context("gateway unreachable")?;

        let status = resp.status();
        let body: Option<EnhancementResult> = resp.json().await.ok();
        match body {
            Some(EnhancementResult::Enhanced { enhanced_url }) if status.is_success() => {
                Ok(enhanced_url)
            }
            Some(EnhancementResult::Failed { error }) => Err(anyhow!(error)),
            _ => Err(anyhow!("Enhancement failed ({status})")),
        }
    }

    /// Fetch the enhanced photo. When fetching fails (a `data:` URL cannot
    /// be fetched at all) the URL itself is decoded.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        match self.fetch(url).await {
            Ok(bytes) => Ok(bytes),
            Err(fetch_err) => {
                debug!(error = %fetch_err, "fetch failed, trying data URL");
                image::decode(url)
                    .map(|data| data.bytes)
                    .map_err(|_| fetch_err)
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            bail!("download failed ({})", resp.status());
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Drive one comparison session from photo selection to a settled phase.
pub async fn restore(
    client: &GatewayClient,
    session: &mut ComparisonSession,
    data_url: String,
) -> Result<Phase> {
    let ticket = session.select_image(data_url)?;
    let image = session
        .uploaded()
        .context("session lost the uploaded photo")?
        .to_string();

    let outcome = client.enhance(&image).await.map_err(|e| {
        warn!(error = %e, "enhancement failed");
        e.to_string()
    });
    if outcome.is_ok() {
        info!("enhancement received");
    }
    session.complete(ticket, outcome);
    Ok(session.phase())
}

/// Write the downloaded photo to `path`.
pub async fn save(bytes: &[u8], path: &Path) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
