//! The enhancement lifecycle: submit a job, poll it until it settles,
//! extract the result URL.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_MAX_POLLS, DEFAULT_POLL_DEADLINE, DEFAULT_POLL_INTERVAL};
use crate::error::EnhanceError;
use crate::provider::{EnhanceParams, Job, JobInput, JobStatus, Provider};

/// Body of `POST /api/enhance`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancementRequest {
    #[serde(default)]
    pub image: Option<String>,
}

impl EnhancementRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
        }
    }

    /// The image, unless it is absent or blank.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// What the endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnhancementResult {
    Enhanced {
        #[serde(rename = "enhancedUrl")]
        enhanced_url: String,
    },
    Failed {
        error: String,
    },
}

/// How long and how often to ask the provider about a job.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    /// Budget for the whole enhancement, submission included.
    pub deadline: Duration,
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_POLL_DEADLINE,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

/// Wires a provider to the fixed enhancement parameters and the poll policy.
pub struct Gateway {
    provider: Arc<dyn Provider>,
    params: EnhanceParams,
    poll: PollConfig,
}

impl Gateway {
    pub fn new(provider: Arc<dyn Provider>, params: EnhanceParams, poll: PollConfig) -> Self {
        Self {
            provider,
            params,
            poll,
        }
    }

    /// Enhance one image and return the URL of the result.
    pub async fn enhance(&self, image: &str, token: &str) -> Result<String, EnhanceError> {
        let started = Instant::now();
        let deadline = started + self.poll.deadline;

        let input = JobInput {
            image: image.to_string(),
            params: self.params,
        };
        let job = timeout_at(deadline, self.provider.create_job(token, &input))
            .await
            .map_err(|_| EnhanceError::TimedOut { polls: 0 })??;
        info!(job = %job.id, status = %job.status, "submitted enhancement job");

        let job = self.wait_for(token, job, deadline).await?;
        let url = Self::settle(job)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "enhancement finished");
        Ok(url)
    }

    /// Poll until the job reaches a terminal state, the attempt budget runs
    /// out, or the deadline passes.
    async fn wait_for(
        &self,
        token: &str,
        submitted: Job,
        deadline: Instant,
    ) -> Result<Job, EnhanceError> {
        let mut last = submitted.status;
        let mut polls = 0;

        loop {
            let fetch = self.provider.get_job(token, &submitted.id);
            let job = match timeout_at(deadline, fetch).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(job = %submitted.id, polls, "giving up: deadline passed mid-request");
                    return Err(EnhanceError::TimedOut { polls });
                }
            };
            polls += 1;

            if !job.status.can_follow(last) {
                return Err(EnhanceError::StatusRegressed {
                    id: job.id,
                    from: last,
                    to: job.status,
                });
            }
            last = job.status;
            debug!(job = %job.id, status = %job.status, polls, "polled");

            if job.status.is_terminal() {
                return Ok(job);
            }

            if polls >= self.poll.max_polls {
                warn!(job = %submitted.id, polls, "giving up: poll limit reached");
                return Err(EnhanceError::TimedOut { polls });
            }
            if Instant::now() + self.poll.interval > deadline {
                warn!(
                    job = %submitted.id,
                    polls,
                    "giving up: deadline would pass before next poll"
                );
                return Err(EnhanceError::TimedOut { polls });
            }
            sleep(self.poll.interval).await;
        }
    }

    /// Turn a terminal job into its result URL or an error.
    fn settle(job: Job) -> Result<String, EnhanceError> {
        match job.status {
            JobStatus::Succeeded => match job.output_url() {
                Some(url) => Ok(url.to_string()),
                None => {
                    warn!(job = %job.id, output = ?job.output, "unusable output");
                    Err(EnhanceError::InvalidOutput)
                }
            },
            JobStatus::Canceled => Err(EnhanceError::JobFailed(
                job.error_message().unwrap_or("Enhancement canceled").to_string(),
            )),
            JobStatus::Failed | JobStatus::Pending | JobStatus::Processing => {
                Err(EnhanceError::JobFailed(
                    job.error_message().unwrap_or("Enhancement failed").to_string(),
                ))
            }
        }
    }
}
