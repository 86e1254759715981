//! Runtime settings for the gateway.
//!
//! Values come from CLI flags with environment fallbacks (see `main.rs`);
//! this module only holds them and checks they make sense.

use anyhow::{Result, bail};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::consts::{DEFAULT_BIND, DEFAULT_PROVIDER_URL, MODEL_VERSION, default_db_path};
use crate::gateway::PollConfig;
use crate::provider::EnhanceParams;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub provider_url: String,
    pub model_version: String,
    /// Explicit token, tried before the environment and the store.
    pub token: Option<String>,
    /// Credential database. `None` disables the stored-token lookup.
    pub db_path: Option<PathBuf>,
    pub params: EnhanceParams,
    pub poll: PollConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000))),
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            model_version: MODEL_VERSION.to_string(),
            token: None,
            db_path: default_db_path(),
            params: EnhanceParams::default(),
            poll: PollConfig::default(),
        }
    }
}

impl Settings {
    /// Reject combinations that would make every request fail or hang.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.params.codeformer_fidelity) {
            bail!(
                "fidelity must be between 0 and 1, got {}",
                self.params.codeformer_fidelity
            );
        }
        if !(1..=4).contains(&self.params.upscale) {
            bail!("upscale must be between 1 and 4, got {}", self.params.upscale);
        }
        if self.poll.interval.is_zero() {
            bail!("poll interval must be positive");
        }
        if self.poll.max_polls == 0 {
            bail!("max polls must be at least 1");
        }
        if self.poll.deadline < self.poll.interval {
            bail!(
                "deadline ({:?}) is shorter than the poll interval ({:?})",
                self.poll.deadline,
                self.poll.interval
            );
        }
        if self.model_version.trim().is_empty() {
            bail!("model version must not be empty");
        }
        Ok(())
    }
}
