//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Name reported by the health endpoint.
pub const MODULE_NAME: &str = "oldnew";

/// CodeFormer on Replicate, pinned by version hash.
pub const MODEL_VERSION: &str = "7de2ea26c616d5bf2245ad0d5e24f0ff9a6204578a5c876db53142edd9d2cd56";

/// Default Replicate API root.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.replicate.com";

/// Environment variable holding the provider token.
pub const TOKEN_ENV_VAR: &str = "REPLICATE_API_TOKEN";

/// Key under which the token is kept in the credential store.
pub const PROVIDER_KEY: &str = "replicate";

pub const DEFAULT_UPSCALE: u32 = 2;
pub const DEFAULT_FIDELITY: f64 = 0.7;

/// Pause between two status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wall-clock budget for one enhancement, submission included.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(300);

/// Upper bound on status fetches per job.
pub const DEFAULT_MAX_POLLS: u32 = 300;

/// Address the gateway binds to when none is given.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Data URLs of large scans are well above axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// File name used when saving the enhanced photo.
pub const DOWNLOAD_FILE_NAME: &str = "enhanced-photo.png";

/// Default database path: `~/.oldnew/oldnew.db`.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".oldnew").join("oldnew.db"))
}
