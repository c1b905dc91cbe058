use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tracing::debug;

use super::store::{CredentialStore, StoredSession, UserProfile};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token and user profile persisted as JSON in the cache directory.
///
/// Every operation goes to disk; the mutex only serializes
/// read-modify-write cycles within this process.
pub struct SessionFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionFile {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load session from disk
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let session: StoredSession =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }

    /// Apply `change` to the stored session; deletes the file once it holds nothing.
    fn modify(&self, change: impl FnOnce(&mut StoredSession)) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("Session file lock poisoned"))?;

        let mut session = self.load()?.unwrap_or_else(StoredSession::empty);
        change(&mut session);
        session.updated_at = Utc::now();

        if !session.is_empty() {
            return self.save(&session);
        }
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            debug!(path = %self.path.display(), "Session file removed");
        }
        Ok(())
    }

    fn read_quietly(&self) -> Option<StoredSession> {
        match self.load() {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Unreadable session file");
                None
            }
        }
    }
}

impl CredentialStore for SessionFile {
    fn token(&self) -> Option<String> {
        self.read_quietly().and_then(|s| s.token)
    }

    fn user(&self) -> Option<UserProfile> {
        self.read_quietly().and_then(|s| s.user)
    }

    fn store_token(&self, token: &str) -> Result<()> {
        self.modify(|s| s.token = Some(token.to_string()))
    }

    fn store_user(&self, user: &UserProfile) -> Result<()> {
        self.modify(|s| s.user = Some(user.clone()))
    }

    fn remove_token(&self) -> Result<()> {
        self.modify(|s| s.token = None)
    }

    fn remove_user(&self) -> Result<()> {
        self.modify(|s| s.user = None)
    }
}
