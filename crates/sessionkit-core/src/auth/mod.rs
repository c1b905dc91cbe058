//! Credential storage for the signed-in session.
//!
//! This module provides:
//! - `CredentialStore`: the capability forced logout uses to purge the
//!   access token and user profile
//! - `SessionFile`: a JSON session file in the cache directory
//! - `KeychainCredentials`: OS-level credential storage via keyring

pub mod keychain;
pub mod session;
pub mod store;

pub use keychain::KeychainCredentials;
pub use session::SessionFile;
pub use store::{CredentialStore, StoredSession, UserProfile};
