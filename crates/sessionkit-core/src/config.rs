//! Application configuration management.
//!
//! This module handles loading and saving the session-layer configuration:
//! the API endpoint, cache and sync timings, login routes and which
//! credential backend to use.
//!
//! Configuration is stored at `~/.config/sessionkit/config.json`. Every field
//! has a default, so a missing file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sync::SyncConfig;
use crate::terminate::{DEFAULT_LOGIN_PATH, DEFAULT_LOGIN_ROUTE};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionkit";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keychain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub default_cache_ttl_ms: u64,
    /// Zero disables the bound.
    pub remote_logout_timeout_secs: u64,
    pub sync_interval_secs: u64,
    pub sync_max_errors: u32,
    /// Minimum time after a successful sync before the next one runs.
    pub sync_min_gap_secs: u64,
    pub login_route: String,
    pub login_path: String,
    pub credential_backend: CredentialBackend,
    /// Where the session file lives; defaults to the platform cache dir.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            default_cache_ttl_ms: 60_000,
            remote_logout_timeout_secs: 10,
            sync_interval_secs: 120,
            sync_max_errors: 3,
            sync_min_gap_secs: 60,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            credential_backend: CredentialBackend::File,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Replace the API endpoint when `url` is set (e.g. from the environment).
    pub fn with_api_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.default_cache_ttl_ms)
    }

    pub fn remote_logout_timeout(&self) -> Option<Duration> {
        match self.remote_logout_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            interval: Duration::from_secs(self.sync_interval_secs.max(1)),
            max_errors: self.sync_max_errors,
            min_gap: Duration::from_secs(self.sync_min_gap_secs),
        }
    }
}
