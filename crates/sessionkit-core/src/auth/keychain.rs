use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use super::store::{CredentialStore, UserProfile};

const SERVICE_NAME: &str = "sessionkit";

const TOKEN_ACCOUNT: &str = "access-token";
const USER_ACCOUNT: &str = "user-profile";

/// Token and user profile kept in the OS keychain.
///
/// The user profile is stored as JSON in its own entry.
pub struct KeychainCredentials {
    token: Entry,
    user: Entry,
}

impl KeychainCredentials {
    pub fn new() -> Result<Self> {
        Self::for_service(SERVICE_NAME)
    }

    /// Use a custom keychain service name, e.g. one per deployment.
    pub fn for_service(service: &str) -> Result<Self> {
        let token = Entry::new(service, TOKEN_ACCOUNT).context("Failed to create keyring entry")?;
        let user = Entry::new(service, USER_ACCOUNT).context("Failed to create keyring entry")?;
        Ok(Self { token, user })
    }

    fn delete(entry: &Entry, what: &str) -> Result<()> {
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                debug!(what, "Nothing stored in keychain");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keychain", what)),
        }
    }
}

impl CredentialStore for KeychainCredentials {
    fn token(&self) -> Option<String> {
        self.token.get_password().ok()
    }

    fn user(&self) -> Option<UserProfile> {
        let raw = self.user.get_password().ok()?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "Unparseable user profile in keychain");
                None
            }
        }
    }

    fn store_token(&self, token: &str) -> Result<()> {
        self.token
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn store_user(&self, user: &UserProfile) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.user
            .set_password(&raw)
            .context("Failed to store user profile in keychain")
    }

    fn remove_token(&self) -> Result<()> {
        Self::delete(&self.token, "token")
    }

    fn remove_user(&self) -> Result<()> {
        Self::delete(&self.user, "user profile")
    }
}
