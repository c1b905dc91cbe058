use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile of the signed-in user, as persisted next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn empty() -> Self {
        Self {
            token: None,
            user: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

/// Persistent client-side credentials.
///
/// Removal of something that is not stored succeeds. Errors are reserved
/// for the storage layer itself failing.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;

    fn user(&self) -> Option<UserProfile>;

    fn store_token(&self, token: &str) -> Result<()>;

    fn store_user(&self, user: &UserProfile) -> Result<()>;

    fn remove_token(&self) -> Result<()>;

    fn remove_user(&self) -> Result<()>;

    fn has_token(&self) -> bool {
        self.token().is_some()
    }
}
