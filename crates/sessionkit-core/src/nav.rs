//! Client-side navigation.
//!
//! The web client routes with URL fragments (`#/login`); the packaged mobile
//! shell can only load paths. `Navigator` covers both so forced logout can
//! prefer the hash route and fall back to a path.

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use tracing::debug;

pub trait Navigator: Send + Sync {
    /// Whether fragment-based routing is available in this shell.
    fn supports_hash(&self) -> bool;

    fn current_hash(&self) -> Option<String>;

    fn set_hash(&self, hash: &str) -> Result<()>;

    fn current_path(&self) -> String;

    fn assign_path(&self, path: &str) -> Result<()>;
}

/// True when `current` already shows `target`, ignoring a query string or
/// trailing sub-route (`#/login?next=/x` counts as `#/login`).
pub fn is_at(current: &str, target: &str) -> bool {
    match current.strip_prefix(target) {
        Some(rest) => rest.is_empty() || rest.starts_with('?') || rest.starts_with('/'),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Hash(String),
    Path(String),
}

#[derive(Debug, Clone)]
struct Location {
    hash: Option<String>,
    path: String,
}

/// Navigator holding the location in memory, with a log of every change.
///
/// Used by embedding shells that drive the real view from the log, and by
/// tests.
pub struct MemoryNavigator {
    hash_supported: bool,
    location: Mutex<Location>,
    history: Mutex<Vec<Navigation>>,
}

impl MemoryNavigator {
    pub fn new(path: impl Into<String>, hash: Option<&str>) -> Self {
        Self {
            hash_supported: true,
            location: Mutex::new(Location {
                hash: hash.map(str::to_string),
                path: path.into(),
            }),
            history: Mutex::new(Vec::new()),
        }
    }

    /// A shell without fragment routing.
    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            hash_supported: false,
            ..Self::new(path, None)
        }
    }

    fn location(&self) -> MutexGuard<'_, Location> {
        self.location.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, nav: Navigation) {
        debug!(?nav, "Navigated");
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(nav);
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn navigation_count(&self) -> usize {
        self.history().len()
    }
}

impl Navigator for MemoryNavigator {
    fn supports_hash(&self) -> bool {
        self.hash_supported
    }

    fn current_hash(&self) -> Option<String> {
        self.location().hash.clone()
    }

    fn set_hash(&self, hash: &str) -> Result<()> {
        if !self.hash_supported {
            anyhow::bail!("Hash routing is not available");
        }
        self.location().hash = Some(hash.to_string());
        self.record(Navigation::Hash(hash.to_string()));
        Ok(())
    }

    fn current_path(&self) -> String {
        self.location().path.clone()
    }

    fn assign_path(&self, path: &str) -> Result<()> {
        {
            let mut location = self.location();
            location.path = path.to_string();
            location.hash = None;
        }
        self.record(Navigation::Path(path.to_string()));
        Ok(())
    }
}
