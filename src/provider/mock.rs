use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Instant;

use crate::error::EnhanceError;

use super::{Job, JobInput, JobStatus, Provider};

/// Id handed out for every scripted submission.
pub const MOCK_JOB_ID: &str = "mock-job";

/// A scripted provider for tests. Status reads return the scripted jobs in
/// order; once the script runs out the last entry repeats, so a single
/// `processing` entry models a job that never finishes.
pub struct MockProvider {
    submit_error: Option<String>,
    polls: Vec<Job>,
    index: AtomicUsize,
    inputs: Mutex<Vec<JobInput>>,
    poll_times: Mutex<Vec<Instant>>,
}

impl MockProvider {
    pub fn new(polls: Vec<Job>) -> Self {
        Self {
            submit_error: None,
            polls,
            index: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            poll_times: Mutex::new(Vec::new()),
        }
    }

    /// A provider that rejects the submission outright.
    pub fn rejecting(message: &str) -> Self {
        Self {
            submit_error: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// A provider whose job sits in the given status forever.
    pub fn stuck(status: JobStatus) -> Self {
        Self::new(vec![Job::new(MOCK_JOB_ID, status)])
    }

    /// Number of job submissions received.
    pub fn submissions(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    /// Inputs of every submission, oldest first.
    pub fn inputs(&self) -> Vec<JobInput> {
        self.inputs.lock().unwrap().clone()
    }

    /// Number of status reads received.
    pub fn status_fetches(&self) -> usize {
        self.poll_times.lock().unwrap().len()
    }

    /// When each status read happened, on the tokio clock.
    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_times.lock().unwrap().clone()
    }
}

/// Shorthand for a succeeded job with the given output.
pub fn succeeded(output: serde_json::Value) -> Job {
    Job::new(MOCK_JOB_ID, JobStatus::Succeeded).with_output(output)
}

/// Shorthand for a failed job with the given error.
pub fn failed(error: serde_json::Value) -> Job {
    Job::new(MOCK_JOB_ID, JobStatus::Failed).with_error(error)
}

/// Shorthand for a non-terminal job.
pub fn in_state(status: JobStatus) -> Job {
    Job::new(MOCK_JOB_ID, status)
}

#[async_trait]
impl Provider for MockProvider {
    async fn create_job(&self, _token: &str, input: &JobInput) -> Result<Job, EnhanceError> {
        self.inputs.lock().unwrap().push(input.clone());
        if let Some(message) = &self.submit_error {
            return Err(EnhanceError::Transport(message.clone()));
        }
        Ok(Job::new(MOCK_JOB_ID, JobStatus::Pending))
    }

    async fn get_job(&self, _token: &str, id: &str) -> Result<Job, EnhanceError> {
        self.poll_times.lock().unwrap().push(Instant::now());
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        let job = self
            .polls
            .get(i)
            .or_else(|| self.polls.last())
            .ok_or_else(|| {
                EnhanceError::Transport(format!("MockProvider: no scripted status for {id}"))
            })?;
        Ok(job.clone())
    }
}
