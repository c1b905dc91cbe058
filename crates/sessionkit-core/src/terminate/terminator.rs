use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::step::{attempt, guarded, StepStatus, Step, TerminationReport};
use crate::api::ApiLogout;
use crate::auth::CredentialStore;
use crate::events::{EventSink, TerminationEvent};
use crate::nav::{is_at, Navigator};
use crate::sync::SyncService;

/// Reason used when a caller gives none.
pub const DEFAULT_REASON: &str = "SESSION_EXPIRED";

pub const DEFAULT_LOGIN_ROUTE: &str = "#/login";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationState {
    Idle,
    Terminating,
}

/// Marks the terminator busy for as long as it lives, unwinding included.
struct Busy<'a>(&'a AtomicBool);

impl<'a> Busy<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Busy(flag))
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Ends a client session: revokes it remotely, purges local credentials,
/// halts background sync, routes to the login view and announces why.
///
/// Every collaborator is optional; a missing one makes its step a skip.
/// Build one per application at startup and share it behind an `Arc`.
pub struct SessionTerminator {
    api: Option<Arc<dyn ApiLogout>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    sync: Option<Arc<dyn SyncService>>,
    navigator: Option<Arc<dyn Navigator>>,
    events: Option<Arc<dyn EventSink>>,
    login_route: String,
    login_path: String,
    remote_timeout: Option<Duration>,
    busy: AtomicBool,
}

impl Default for SessionTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTerminator {
    pub fn new() -> Self {
        Self {
            api: None,
            credentials: None,
            sync: None,
            navigator: None,
            events: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            remote_timeout: None,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_api(mut self, api: Arc<dyn ApiLogout>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_sync(mut self, sync: Arc<dyn SyncService>) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Hash route and path of the login view.
    pub fn with_login(mut self, route: impl Into<String>, path: impl Into<String>) -> Self {
        self.login_route = route.into();
        self.login_path = path.into();
        self
    }

    /// Bound the remote logout call. Without this it takes as long as the
    /// API client lets it.
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> TerminationState {
        if self.busy.load(Ordering::Acquire) {
            TerminationState::Terminating
        } else {
            TerminationState::Idle
        }
    }

    /// Terminate with the default `SESSION_EXPIRED` reason.
    pub async fn terminate_expired(&self) -> TerminationReport {
        self.terminate(DEFAULT_REASON).await
    }

    /// Run all five steps in order, each isolated from the others' failures.
    ///
    /// The report is informational; nothing here returns an error. A call
    /// made while another is still running returns at once as `coalesced`.
    pub async fn terminate(&self, reason: impl Into<String>) -> TerminationReport {
        let reason = reason.into();
        let Some(_busy) = Busy::acquire(&self.busy) else {
            debug!(reason = %reason, "Termination already in progress, coalescing");
            return TerminationReport::coalesced(reason);
        };

        info!(reason = %reason, "Terminating session");

        let mut outcomes = Vec::with_capacity(Step::ALL.len());
        outcomes.push(attempt(Step::RemoteLogout, self.remote_logout()).await);
        outcomes.push(attempt(Step::CredentialPurge, self.purge_credentials()).await);
        outcomes.push(attempt(Step::SyncHalt, self.halt_sync()).await);
        outcomes.push(attempt(Step::Navigate, self.navigate_to_login()).await);
        outcomes.push(attempt(Step::Notify, self.notify(&reason)).await);

        let report = TerminationReport {
            reason,
            coalesced: false,
            outcomes,
        };
        info!(
            reason = %report.reason,
            failures = report.failures().count(),
            "Session terminated"
        );
        report
    }

    /// Fire-and-forget variant for call sites that must not wait.
    pub fn spawn_terminate(self: &Arc<Self>, reason: impl Into<String>) -> JoinHandle<TerminationReport> {
        let this = Arc::clone(self);
        let reason = reason.into();
        tokio::spawn(async move { this.terminate(reason).await })
    }

    async fn remote_logout(&self) -> Result<StepStatus> {
        let Some(ref api) = self.api else {
            return Ok(StepStatus::skipped("no API client"));
        };
        match self.remote_timeout {
            Some(limit) => tokio::time::timeout(limit, api.logout())
                .await
                .map_err(|_| anyhow!("timed out after {}ms", limit.as_millis()))?
                .context("remote logout")?,
            None => api.logout().await.context("remote logout")?,
        }
        Ok(StepStatus::Completed)
    }

    async fn purge_credentials(&self) -> Result<StepStatus> {
        let Some(ref store) = self.credentials else {
            return Ok(StepStatus::skipped("no credential store"));
        };
        // Both removals run even if the first one fails.
        let token = guarded(|| store.remove_token());
        let user = guarded(|| store.remove_user());
        match (token, user) {
            (Ok(()), Ok(())) => Ok(StepStatus::Completed),
            (Err(e), Ok(())) => Err(e.context("remove token")),
            (Ok(()), Err(e)) => Err(e.context("remove user")),
            (Err(t), Err(u)) => Err(anyhow!("remove token: {:#}; remove user: {:#}", t, u)),
        }
    }

    async fn halt_sync(&self) -> Result<StepStatus> {
        let Some(ref sync) = self.sync else {
            return Ok(StepStatus::skipped("no sync service"));
        };
        sync.stop().await.context("stop live sync")?;
        Ok(StepStatus::Completed)
    }

    async fn navigate_to_login(&self) -> Result<StepStatus> {
        let Some(ref nav) = self.navigator else {
            return Ok(StepStatus::skipped("no navigator"));
        };

        // Any navigator call may panic; each one is guarded so the path
        // fallback stays reachable.
        match self.navigate_by_hash(nav.as_ref()) {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Hash navigation failed, falling back to path");
            }
        }

        match guarded(|| Ok(nav.current_path())) {
            Ok(path) if is_at(&path, &self.login_path) => {
                return Ok(StepStatus::skipped("already on login view"));
            }
            Ok(_) => {}
            Err(e) => debug!(error = %format!("{:#}", e), "Current path unreadable, assigning anyway"),
        }
        guarded(|| nav.assign_path(&self.login_path)).context("path navigation")?;
        Ok(StepStatus::Completed)
    }

    /// `None` when the navigator has no hash routing.
    fn navigate_by_hash(&self, nav: &dyn Navigator) -> Result<Option<StepStatus>> {
        if !guarded(|| Ok(nav.supports_hash()))? {
            return Ok(None);
        }
        let current = guarded(|| Ok(nav.current_hash()))?.unwrap_or_default();
        if is_at(&current, &self.login_route) {
            return Ok(Some(StepStatus::skipped("already on login view")));
        }
        guarded(|| nav.set_hash(&self.login_route))?;
        Ok(Some(StepStatus::Completed))
    }

    async fn notify(&self, reason: &str) -> Result<StepStatus> {
        let Some(ref events) = self.events else {
            return Ok(StepStatus::skipped("no event sink"));
        };
        let event = TerminationEvent {
            reason: reason.to_string(),
        };
        events.broadcast(&event).context("broadcast termination event")?;
        Ok(StepStatus::Completed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserProfile;
    use crate::events::EventBus;
    use crate::nav::{MemoryNavigator, Navigation};
    use crate::sync::{LiveSync, SyncConfig, SyncSource};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -------------------------------------------------------------------------
    // Recording collaborators
    // -------------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl Recorder {
        fn push(&self, call: &'static str) {
            self.0.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Ok,
        Fail,
        Panic,
    }

    fn act(mode: Mode, what: &str) -> Result<()> {
        match mode {
            Mode::Ok => Ok(()),
            Mode::Fail => Err(anyhow!("{} unavailable", what)),
            Mode::Panic => panic!("{} blew up", what),
        }
    }

    struct StubApi {
        rec: Recorder,
        mode: Mode,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ApiLogout for StubApi {
        async fn logout(&self) -> Result<()> {
            self.rec.push("logout");
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            act(self.mode, "server")
        }
    }

    struct StubStore {
        rec: Recorder,
        mode: Mode,
        token: Mutex<Option<String>>,
        user: Mutex<Option<UserProfile>>,
    }

    impl CredentialStore for StubStore {
        fn token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn user(&self) -> Option<UserProfile> {
            self.user.lock().unwrap().clone()
        }

        fn store_token(&self, token: &str) -> Result<()> {
            *self.token.lock().unwrap() = Some(token.to_string());
            Ok(())
        }

        fn store_user(&self, user: &UserProfile) -> Result<()> {
            *self.user.lock().unwrap() = Some(user.clone());
            Ok(())
        }

        fn remove_token(&self) -> Result<()> {
            self.rec.push("remove_token");
            act(self.mode, "storage")?;
            *self.token.lock().unwrap() = None;
            Ok(())
        }

        fn remove_user(&self) -> Result<()> {
            self.rec.push("remove_user");
            *self.user.lock().unwrap() = None;
            Ok(())
        }
    }

    struct StubSync {
        rec: Recorder,
        mode: Mode,
        running: AtomicBool,
    }

    #[async_trait]
    impl SyncService for StubSync {
        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        async fn stop(&self) -> Result<()> {
            self.rec.push("sync_stop");
            act(self.mode, "sync")?;
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingNavigator {
        rec: Recorder,
        inner: MemoryNavigator,
        hash_fails: bool,
        hash_read_panics: bool,
    }

    impl Navigator for RecordingNavigator {
        fn supports_hash(&self) -> bool {
            self.inner.supports_hash()
        }

        fn current_hash(&self) -> Option<String> {
            if self.hash_read_panics {
                panic!("history state corrupted");
            }
            self.inner.current_hash()
        }

        fn set_hash(&self, hash: &str) -> Result<()> {
            self.rec.push("set_hash");
            if self.hash_fails {
                anyhow::bail!("location.hash is read-only here");
            }
            self.inner.set_hash(hash)
        }

        fn current_path(&self) -> String {
            self.inner.current_path()
        }

        fn assign_path(&self, path: &str) -> Result<()> {
            self.rec.push("assign_path");
            self.inner.assign_path(path)
        }
    }

    struct StubEvents {
        rec: Recorder,
        mode: Mode,
        reasons: Mutex<Vec<String>>,
    }

    impl EventSink for StubEvents {
        fn broadcast(&self, event: &TerminationEvent) -> Result<()> {
            self.rec.push("broadcast");
            act(self.mode, "event bus")?;
            self.reasons.lock().unwrap().push(event.reason.clone());
            Ok(())
        }
    }

    struct Harness {
        rec: Recorder,
        store: Arc<StubStore>,
        sync: Arc<StubSync>,
        nav: Arc<RecordingNavigator>,
        events: Arc<StubEvents>,
        terminator: SessionTerminator,
    }

    struct Modes {
        api: Mode,
        store: Mode,
        sync: Mode,
        events: Mode,
        api_delay: Option<Duration>,
        nav: MemoryNavigator,
        hash_fails: bool,
        hash_read_panics: bool,
    }

    impl Default for Modes {
        fn default() -> Self {
            Self {
                api: Mode::Ok,
                store: Mode::Ok,
                sync: Mode::Ok,
                events: Mode::Ok,
                api_delay: None,
                nav: MemoryNavigator::new("/", Some("#/dashboard")),
                hash_fails: false,
                hash_read_panics: false,
            }
        }
    }

    fn harness(modes: Modes) -> Harness {
        let rec = Recorder::default();
        let api = Arc::new(StubApi {
            rec: rec.clone(),
            mode: modes.api,
            delay: modes.api_delay,
        });
        let store = Arc::new(StubStore {
            rec: rec.clone(),
            mode: modes.store,
            token: Mutex::new(Some("tok".to_string())),
            user: Mutex::new(Some(UserProfile {
                id: "1".to_string(),
                email: "a@example.com".to_string(),
                name: None,
            })),
        });
        let sync = Arc::new(StubSync {
            rec: rec.clone(),
            mode: modes.sync,
            running: AtomicBool::new(true),
        });
        let nav = Arc::new(RecordingNavigator {
            rec: rec.clone(),
            inner: modes.nav,
            hash_fails: modes.hash_fails,
            hash_read_panics: modes.hash_read_panics,
        });
        let events = Arc::new(StubEvents {
            rec: rec.clone(),
            mode: modes.events,
            reasons: Mutex::new(Vec::new()),
        });
        let terminator = SessionTerminator::new()
            .with_api(api)
            .with_credentials(store.clone())
            .with_sync(sync.clone())
            .with_navigator(nav.clone())
            .with_events(events.clone());
        Harness {
            rec,
            store,
            sync,
            nav,
            events,
            terminator,
        }
    }

    // -------------------------------------------------------------------------
    // Ordering and fault tolerance
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let h = harness(Modes::default());

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(
            h.rec.calls(),
            vec!["logout", "remove_token", "remove_user", "sync_stop", "set_hash", "broadcast"]
        );
        assert_eq!(report.steps(), Step::ALL.to_vec());
        assert!(report.is_clean());
        assert!(!report.coalesced);
    }

    #[tokio::test]
    async fn test_order_holds_when_every_step_fails() {
        let h = harness(Modes {
            api: Mode::Fail,
            store: Mode::Fail,
            sync: Mode::Fail,
            events: Mode::Fail,
            hash_fails: true,
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(
            h.rec.calls(),
            vec![
                "logout",
                "remove_token",
                "remove_user",
                "sync_stop",
                "set_hash",
                "assign_path",
                "broadcast"
            ]
        );
        assert_eq!(report.steps(), Step::ALL.to_vec());
        assert_eq!(report.failures().count(), 4);
        assert_eq!(report.status(Step::Navigate), Some(&StepStatus::Completed));
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_stop_cleanup() {
        let h = harness(Modes {
            api: Mode::Fail,
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert!(report.status(Step::RemoteLogout).unwrap().is_failed());
        assert!(h.store.token().is_none());
        assert!(h.store.user().is_none());
        assert!(!h.sync.is_running());
        assert_eq!(h.nav.current_hash().as_deref(), Some("#/login"));
        assert_eq!(*h.events.reasons.lock().unwrap(), vec!["SESSION_EXPIRED"]);
    }

    #[tokio::test]
    async fn test_token_failure_still_removes_user() {
        let h = harness(Modes {
            store: Mode::Fail,
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(
            report.status(Step::CredentialPurge),
            Some(&StepStatus::Failed("remove token: storage unavailable".to_string()))
        );
        assert!(h.store.user().is_none());
        assert!(!h.sync.is_running());
    }

    #[tokio::test]
    async fn test_panicking_collaborators_are_isolated() {
        let h = harness(Modes {
            api: Mode::Panic,
            store: Mode::Panic,
            sync: Mode::Panic,
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(
            report.status(Step::SyncHalt),
            Some(&StepStatus::Failed("panicked: sync blew up".to_string()))
        );
        assert!(h.store.user().is_none());
        assert_eq!(h.nav.current_hash().as_deref(), Some("#/login"));
        assert_eq!(*h.events.reasons.lock().unwrap(), vec!["SESSION_EXPIRED"]);
        assert_eq!(h.terminator.state(), TerminationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_moves_on() {
        let mut h = harness(Modes {
            api_delay: Some(Duration::from_secs(120)),
            ..Modes::default()
        });
        h.terminator = h.terminator.with_remote_timeout(Duration::from_secs(5));

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(
            report.status(Step::RemoteLogout),
            Some(&StepStatus::Failed("timed out after 5000ms".to_string()))
        );
        assert!(h.store.token().is_none());
        assert_eq!(h.nav.current_hash().as_deref(), Some("#/login"));
    }

    // -------------------------------------------------------------------------
    // Idempotence and navigation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_second_termination_is_harmless() {
        let h = harness(Modes::default());

        let first = h.terminator.terminate("SESSION_EXPIRED").await;
        let second = h.terminator.terminate("SESSION_EXPIRED").await;

        assert!(first.is_clean());
        assert!(second.is_clean());
        assert_eq!(
            second.status(Step::Navigate),
            Some(&StepStatus::skipped("already on login view"))
        );
        assert_eq!(h.nav.inner.history(), vec![Navigation::Hash("#/login".to_string())]);
        assert_eq!(h.nav.current_hash().as_deref(), Some("#/login"));
    }

    #[tokio::test]
    async fn test_already_on_login_does_not_navigate() {
        let h = harness(Modes {
            nav: MemoryNavigator::new("/", Some("#/login?next=%2Fprojects")),
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(h.nav.inner.navigation_count(), 0);
        assert!(!h.rec.calls().contains(&"set_hash"));
        assert!(matches!(report.status(Step::Navigate), Some(StepStatus::Skipped(_))));
    }

    #[tokio::test]
    async fn test_path_fallback_without_hash_routing() {
        let h = harness(Modes {
            nav: MemoryNavigator::path_only("/clients"),
            ..Modes::default()
        });

        h.terminator.terminate("SESSION_EXPIRED").await;
        h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(h.nav.current_path(), "/login");
        assert_eq!(h.nav.inner.history(), vec![Navigation::Path("/login".to_string())]);
    }

    #[tokio::test]
    async fn test_path_fallback_when_hash_write_fails() {
        let h = harness(Modes {
            hash_fails: true,
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(report.status(Step::Navigate), Some(&StepStatus::Completed));
        assert_eq!(h.nav.current_path(), "/login");
    }

    #[tokio::test]
    async fn test_path_fallback_when_hash_read_panics() {
        let h = harness(Modes {
            nav: MemoryNavigator::new("/clients", Some("#/dashboard")),
            hash_read_panics: true,
            ..Modes::default()
        });

        let report = h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(report.status(Step::Navigate), Some(&StepStatus::Completed));
        assert_eq!(h.nav.current_path(), "/login");
        assert_eq!(h.rec.calls()[4..], ["assign_path", "broadcast"]);
        assert_eq!(*h.events.reasons.lock().unwrap(), vec!["SESSION_EXPIRED"]);
    }

    #[tokio::test]
    async fn test_custom_login_route() {
        let mut h = harness(Modes::default());
        h.terminator = h.terminator.with_login("#/signin", "/signin");

        h.terminator.terminate("SESSION_EXPIRED").await;

        assert_eq!(h.nav.current_hash().as_deref(), Some("#/signin"));
    }

    // -------------------------------------------------------------------------
    // Reentrancy, defaults, events
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_are_coalesced() {
        let h = harness(Modes {
            api_delay: Some(Duration::from_millis(50)),
            ..Modes::default()
        });

        let (first, second) = tokio::join!(
            h.terminator.terminate("UNAUTHORIZED"),
            h.terminator.terminate("SESSION_EXPIRED")
        );

        assert!(!first.coalesced);
        assert!(second.coalesced);
        assert!(second.outcomes.is_empty());
        assert_eq!(h.rec.calls().iter().filter(|c| **c == "logout").count(), 1);
        assert_eq!(h.terminator.state(), TerminationState::Idle);
    }

    #[tokio::test]
    async fn test_without_collaborators_everything_is_skipped() {
        let terminator = SessionTerminator::new();

        let report = terminator.terminate_expired().await;

        assert_eq!(report.reason, DEFAULT_REASON);
        assert_eq!(report.outcomes.len(), 5);
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o.status, StepStatus::Skipped(_))));
    }

    #[tokio::test]
    async fn test_event_bus_receives_reason() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let terminator = Arc::new(SessionTerminator::new().with_events(bus));

        let report = terminator.spawn_terminate("UNAUTHORIZED").await.unwrap();

        assert!(report.is_clean());
        assert_eq!(rx.recv().await.unwrap().reason, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_event_bus_without_listeners_completes() {
        let terminator = SessionTerminator::new().with_events(Arc::new(EventBus::new()));

        let report = terminator.terminate_expired().await;

        assert_eq!(report.status(Step::Notify), Some(&StepStatus::Completed));
    }

    // -------------------------------------------------------------------------
    // Live sync wiring
    // -------------------------------------------------------------------------

    struct NeverFinishes;

    #[async_trait]
    impl SyncSource for NeverFinishes {
        async fn sync(&self) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_sync_pass_does_not_block_logout() {
        let sync = Arc::new(LiveSync::new(Arc::new(NeverFinishes), SyncConfig::default()));
        sync.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sync.status().in_progress);

        let nav = Arc::new(MemoryNavigator::new("/", Some("#/dashboard")));
        let terminator = SessionTerminator::new()
            .with_sync(sync.clone())
            .with_navigator(nav.clone());

        let report = tokio::time::timeout(
            Duration::from_secs(3600),
            terminator.terminate("SESSION_EXPIRED"),
        )
        .await
        .expect("terminate must not wait on a hung sync pass");

        assert_eq!(report.status(Step::SyncHalt), Some(&StepStatus::Completed));
        assert_eq!(report.status(Step::Navigate), Some(&StepStatus::Completed));
        assert_eq!(nav.current_hash().as_deref(), Some("#/login"));
        assert!(!sync.is_running());
        assert!(!sync.status().in_progress);
    }
}
