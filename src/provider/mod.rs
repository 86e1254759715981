pub mod mock;
pub mod replicate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::{DEFAULT_FIDELITY, DEFAULT_UPSCALE};
use crate::error::EnhanceError;

/// Lifecycle of a job on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "starting")]
    Pending,
    Processing,
    Succeeded,
    Failed,
    /// Someone canceled the job upstream. Terminal, reported as a failure.
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Position in the lifecycle. A job may only move to an equal or higher rank.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Succeeded | Self::Failed | Self::Canceled => 2,
        }
    }

    pub fn can_follow(self, previous: JobStatus) -> bool {
        self.rank() >= previous.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// A job as last reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            output: None,
            error: None,
        }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: serde_json::Value) -> Self {
        self.error = Some(error);
        self
    }

    /// The single result URL, if the output has that shape.
    pub fn output_url(&self) -> Option<&str> {
        self.output
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Provider-supplied failure reason, when it is a usable string.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Fixed knobs sent with every job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnhanceParams {
    pub upscale: u32,
    pub face_upsample: bool,
    pub background_enhance: bool,
    /// 0 favours quality, 1 favours faithfulness to the original face.
    pub codeformer_fidelity: f64,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            upscale: DEFAULT_UPSCALE,
            face_upsample: true,
            background_enhance: true,
            codeformer_fidelity: DEFAULT_FIDELITY,
        }
    }
}

/// The `input` object of a job submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInput {
    pub image: String,
    #[serde(flatten)]
    pub params: EnhanceParams,
}

/// An external inference service. Could be Replicate, or a test script.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Submit a new job; returns it in whatever state the provider reports.
    async fn create_job(&self, token: &str, input: &JobInput) -> Result<Job, EnhanceError>;

    /// Read the current state of a job.
    async fn get_job(&self, token: &str, id: &str) -> Result<Job, EnhanceError>;
}
