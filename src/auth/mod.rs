//! Where the provider token comes from.
//!
//! Sources are tried in a fixed order and the first non-empty value wins:
//! an explicit value (CLI flag), the process environment, then the token
//! saved by `oldnew login`. Resolution runs per request, so a token saved
//! or exported after startup is picked up without a restart.

pub mod storage;

pub use storage::{StoredToken, TokenStore};

use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::consts::{PROVIDER_KEY, TOKEN_ENV_VAR};

/// One place a token may be found.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Explicit(String),
    Env(String),
    Store(PathBuf),
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(_) => f.write_str("command line"),
            Self::Env(var) => write!(f, "env {var}"),
            Self::Store(path) => write!(f, "store {}", path.display()),
        }
    }
}

impl TokenSource {
    fn lookup(&self) -> Result<Option<String>> {
        let value = match self {
            Self::Explicit(token) => Some(token.clone()),
            Self::Env(var) => std::env::var(var).ok(),
            Self::Store(path) => {
                // Don't create a database just to find out it's empty.
                if !path.exists() {
                    return Ok(None);
                }
                TokenStore::open_read_only(path)?
                    .get(PROVIDER_KEY)?
                    .map(|stored| stored.token)
            }
        };
        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

/// A token together with the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: String,
}

/// Tries each source in order.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    sources: Vec<TokenSource>,
}

impl CredentialResolver {
    pub fn new(sources: Vec<TokenSource>) -> Self {
        Self { sources }
    }

    /// The usual chain: explicit value, `REPLICATE_API_TOKEN`, saved token.
    pub fn standard(explicit: Option<String>, db_path: Option<PathBuf>) -> Self {
        let mut sources = Vec::with_capacity(3);
        if let Some(token) = explicit {
            sources.push(TokenSource::Explicit(token));
        }
        sources.push(TokenSource::Env(TOKEN_ENV_VAR.to_string()));
        if let Some(path) = db_path {
            sources.push(TokenSource::Store(path));
        }
        Self { sources }
    }

    pub fn sources(&self) -> &[TokenSource] {
        &self.sources
    }

    /// First usable token. A broken source is logged and skipped.
    pub fn resolve(&self) -> Option<ResolvedToken> {
        self.sources.iter().find_map(|source| match source.lookup() {
            Ok(Some(token)) => Some(ResolvedToken {
                token,
                source: source.to_string(),
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(%source, error = %e, "credential source unreadable");
                None
            }
        })
    }
}

/// Save a token for later runs.
pub fn login(db_path: &Path, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("no token provided");
    }
    let store = TokenStore::open(db_path).context("failed to open credential store")?;
    store
        .set(PROVIDER_KEY, &StoredToken::new(token))
        .context("failed to save token")?;
    Ok(())
}

/// Forget the saved token. Returns whether one existed.
pub fn logout(db_path: &Path) -> Result<bool> {
    if !db_path.exists() {
        return Ok(false);
    }
    let store = TokenStore::open(db_path).context("failed to open credential store")?;
    store.remove(PROVIDER_KEY).context("failed to remove token")
}
