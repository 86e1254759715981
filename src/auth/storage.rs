use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};

/// A saved provider token.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredToken {
    pub token: String,
    /// Seconds since the epoch when the token was saved.
    pub saved_at: u64,
}

impl StoredToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            saved_at: now_secs(),
        }
    }
}

/// Token storage in SQLite, one row per provider.
pub struct TokenStore {
    conn: Mutex<Connection>,
}

impl TokenStore {
    /// Open or create the credentials table at `path`.
    /// Use `":memory:"` for tests.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let in_memory = path.as_os_str() == ":memory:";
        if !in_memory && let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path).context("failed to open credential database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                provider TEXT PRIMARY KEY,
                data     TEXT NOT NULL
            )",
        )
        .context("failed to create credentials table")?;

        #[cfg(unix)]
        if !in_memory {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict credential database permissions")?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing store for lookups only. Leaves the file, its
    /// directory and its permissions as they are.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open {} read-only", path.display()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the token saved for a provider.
    pub fn get(&self, provider: &str) -> Result<Option<StoredToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM credentials WHERE provider = ?1")?;
        let mut rows = stmt.query([provider])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    /// Save a token for a provider (upsert).
    pub fn set(&self, provider: &str, token: &StoredToken) -> Result<()> {
        let json = serde_json::to_string(token)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO credentials (provider, data) VALUES (?1, ?2)
             ON CONFLICT(provider) DO UPDATE SET data = excluded.data",
            [provider, &json],
        )?;
        Ok(())
    }

    /// Forget the token for a provider. Returns whether one was stored.
    pub fn remove(&self, provider: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM credentials WHERE provider = ?1", [provider])?;
        Ok(removed > 0)
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
