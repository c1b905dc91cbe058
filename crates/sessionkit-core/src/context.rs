//! Startup wiring for the session layer.
//!
//! `SessionContext::build` is the single place where the cache, the
//! terminator and their collaborators are constructed. Everything else gets
//! handles from it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{CredentialStore, KeychainCredentials, SessionFile};
use crate::cache::EphemeralCache;
use crate::config::{Config, CredentialBackend};
use crate::events::EventBus;
use crate::nav::MemoryNavigator;
use crate::sync::{LiveSync, SyncSource};
use crate::terminate::{SessionTerminator, TerminationReport};

/// Reason broadcast when the backend rejects the session.
pub const UNAUTHORIZED_REASON: &str = "UNAUTHORIZED";

/// Reason broadcast when the user signs out.
pub const USER_LOGOUT_REASON: &str = "USER_LOGOUT";

pub struct SessionContext<V = serde_json::Value> {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub credentials: Arc<dyn CredentialStore>,
    pub sync: Option<Arc<LiveSync>>,
    pub navigator: Arc<MemoryNavigator>,
    pub events: EventBus,
    pub cache: EphemeralCache<V>,
    pub terminator: Arc<SessionTerminator>,
}

impl<V> SessionContext<V> {
    /// Construct every component once. `source` enables live sync, which
    /// starts right away when a token and a user are both stored; in that
    /// case this must run inside a tokio runtime.
    ///
    /// A token stored without a user is treated as a broken sign-in and
    /// removed.
    pub fn build(config: Config, source: Option<Arc<dyn SyncSource>>) -> Result<Self> {
        let credentials: Arc<dyn CredentialStore> = match config.credential_backend {
            CredentialBackend::File => Arc::new(SessionFile::new(config.cache_dir()?)),
            CredentialBackend::Keychain => Arc::new(
                KeychainCredentials::new().context("Failed to open keychain credentials")?,
            ),
        };

        let signed_in = match (credentials.has_token(), credentials.user().is_some()) {
            (true, true) => true,
            (true, false) => {
                warn!("Token stored without user data, clearing token");
                credentials
                    .remove_token()
                    .context("Failed to clear orphaned token")?;
                false
            }
            _ => false,
        };

        let mut api = ApiClient::new(config.api_base_url.clone())?;
        if let Some(token) = credentials.token() {
            api.set_token(token);
        }
        let api = Arc::new(api);

        let sync = source.map(|source| {
            Arc::new(LiveSync::new(source, config.sync_config()).with_credentials(credentials.clone()))
        });

        let navigator = Arc::new(MemoryNavigator::new("/", None));
        let events = EventBus::new();

        let mut terminator = SessionTerminator::new()
            .with_api(api.clone())
            .with_credentials(credentials.clone())
            .with_navigator(navigator.clone())
            .with_events(Arc::new(events.clone()))
            .with_login(config.login_route.clone(), config.login_path.clone());
        if let Some(ref sync) = sync {
            terminator = terminator.with_sync(sync.clone());
        }
        if let Some(limit) = config.remote_logout_timeout() {
            terminator = terminator.with_remote_timeout(limit);
        }

        let cache = EphemeralCache::new().with_default_ttl(config.default_cache_ttl());

        if let Some(ref sync) = sync {
            if signed_in {
                info!("Auto-starting live data sync");
                sync.start();
            }
        }

        info!(
            api = %config.api_base_url,
            backend = ?config.credential_backend,
            live_sync = sync.is_some(),
            "Session context ready"
        );

        Ok(Self {
            config,
            api,
            credentials,
            sync,
            navigator,
            events,
            cache,
            terminator: Arc::new(terminator),
        })
    }

    /// Force a logout when `err` means the session is no longer valid.
    pub async fn handle_api_error(&self, err: &ApiError) -> Option<TerminationReport> {
        if !err.is_session_invalid() {
            debug!(error = %err, "API error does not invalidate session");
            return None;
        }
        Some(self.terminator.terminate(UNAUTHORIZED_REASON).await)
    }

    /// User-initiated sign out.
    pub async fn logout(&self, reason: Option<&str>) -> TerminationReport {
        self.terminator
            .terminate(reason.unwrap_or(USER_LOGOUT_REASON))
            .await
    }

    pub fn is_signed_in(&self) -> bool {
        self.credentials.has_token()
    }
}
