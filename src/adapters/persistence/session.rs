//! Session Store - atomic JSON wallet session file
//!
//! Written to a temporary file then renamed over `session.json`, so the
//! file is always either the old or the new session.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument};

use crate::ports::repository::StoredSession;

/// Atomic JSON store for the connected wallet session.
pub struct SessionStore {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl SessionStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: data_dir.join("session.json"),
            tmp_path: data_dir.join("session.json.tmp"),
        })
    }

    #[instrument(skip(self, session))]
    pub async fn save(&self, session: &StoredSession) -> Result<()> {
        let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp session file")?;
        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename session file")?;

        info!(path = %self.path.display(), "Wallet session saved");
        Ok(())
    }

    /// `None` when no session was stored.
    pub async fn load(&self) -> Result<Option<StoredSession>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read session file")?;
        let session = serde_json::from_str(&json).context("Failed to parse session JSON")?;
        Ok(Some(session))
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove session file"),
        }
    }
}
