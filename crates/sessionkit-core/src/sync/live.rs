use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::auth::CredentialStore;

/// Default time between sync passes.
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 120;

/// Consecutive failures after which the loop stops itself.
const DEFAULT_MAX_ERRORS: u32 = 3;

/// Passes closer than this to the last successful one are skipped.
const DEFAULT_MIN_SYNC_GAP_SECS: u64 = 60;

/// One pass of pulling fresh data from the backend.
#[async_trait]
pub trait SyncSource: Send + Sync {
    async fn sync(&self) -> Result<()>;
}

/// A running background sync that can be halted.
#[async_trait]
pub trait SyncService: Send + Sync {
    fn is_running(&self) -> bool;

    /// Stop syncing. Stopping a stopped service succeeds.
    async fn stop(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Syncing,
    Connected,
    Error,
}

/// Published to subscribers on every change.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub running: bool,
    pub connection: ConnectionStatus,
    pub last_sync: Option<DateTime<Utc>>,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub in_progress: bool,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            running: false,
            connection: ConnectionStatus::Disconnected,
            last_sync: None,
            error_count: 0,
            last_error: None,
            in_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    pub interval: Duration,
    pub max_errors: u32,
    pub min_gap: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            max_errors: DEFAULT_MAX_ERRORS,
            min_gap: Duration::from_secs(DEFAULT_MIN_SYNC_GAP_SECS),
        }
    }
}

enum Claim {
    Acquired,
    Busy,
    TooSoon(Duration),
}

#[derive(Clone)]
struct Shared {
    source: Arc<dyn SyncSource>,
    credentials: Option<Arc<dyn CredentialStore>>,
    status: Arc<watch::Sender<SyncStatus>>,
    last_success: Arc<Mutex<Option<Instant>>>,
    max_errors: u32,
    min_gap: Duration,
}

/// Releases the in-progress flag, also when the pass is dropped midway.
struct PassGuard<'a>(&'a Shared);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.status.send_if_modified(|status| {
            let held = status.in_progress;
            status.in_progress = false;
            held
        });
    }
}

impl Shared {
    fn last_success(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_success.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn claim(&self) -> Claim {
        let since_last = (*self.last_success()).map(|at| at.elapsed());
        let mut claim = Claim::Acquired;
        self.status.send_if_modified(|status| {
            if status.in_progress {
                claim = Claim::Busy;
                return false;
            }
            if let Some(since) = since_last.filter(|since| *since < self.min_gap) {
                claim = Claim::TooSoon(since);
                return false;
            }
            status.in_progress = true;
            status.connection = ConnectionStatus::Syncing;
            true
        });
        claim
    }

    /// Run one pass. Returns false once the error budget is exhausted.
    async fn run_once(&self) -> bool {
        match self.claim() {
            Claim::Acquired => {}
            Claim::Busy => {
                debug!("Sync already in progress, skipping");
                return true;
            }
            Claim::TooSoon(since) => {
                debug!(seconds_ago = since.as_secs(), "Sync too recent, skipping");
                return true;
            }
        }
        let _pass = PassGuard(self);

        if let Some(ref credentials) = self.credentials {
            if !credentials.has_token() {
                debug!("No authentication token, skipping sync");
                self.status.send_modify(|status| {
                    status.in_progress = false;
                    status.connection = ConnectionStatus::Disconnected;
                });
                return true;
            }
        }

        let result = self.source.sync().await;
        if result.is_ok() {
            *self.last_success() = Some(Instant::now());
        }

        let mut keep_going = true;
        self.status.send_modify(|status| {
            status.in_progress = false;
            match result {
                Ok(()) => {
                    status.connection = ConnectionStatus::Connected;
                    status.last_sync = Some(Utc::now());
                    status.error_count = 0;
                    status.last_error = None;
                    debug!("Live data sync completed");
                }
                Err(ref e) => {
                    status.connection = ConnectionStatus::Error;
                    status.error_count += 1;
                    status.last_error = Some(format!("{:#}", e));
                    warn!(error = %e, errors = status.error_count, "Live data sync failed");
                    if status.error_count >= self.max_errors {
                        error!(errors = status.error_count, "Too many sync errors, stopping live sync");
                        status.running = false;
                        keep_going = false;
                    }
                }
            }
        });
        keep_going
    }
}

/// Interval-driven background sync on the tokio runtime.
///
/// Status changes are published on a `watch` channel; `subscribe` hands out
/// receivers that start at the current status. Dropping one unsubscribes.
pub struct LiveSync {
    shared: Shared,
    interval: Mutex<Duration>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// tokio intervals reject a zero period.
fn clamp_interval(interval: Duration) -> Duration {
    interval.max(Duration::from_millis(1))
}

impl LiveSync {
    pub fn new(source: Arc<dyn SyncSource>, config: SyncConfig) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            shared: Shared {
                source,
                credentials: None,
                status: Arc::new(status),
                last_success: Arc::new(Mutex::new(None)),
                max_errors: config.max_errors.max(1),
                min_gap: config.min_gap,
            },
            interval: Mutex::new(clamp_interval(config.interval)),
            worker: Mutex::new(None),
        }
    }

    /// Skip passes while `credentials` holds no token.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.shared.credentials = Some(credentials);
        self
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn interval(&self) -> MutexGuard<'_, Duration> {
        self.interval.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn refresh_interval(&self) -> Duration {
        *self.interval()
    }

    /// Start the loop; the first pass runs immediately. Must be called from
    /// within a tokio runtime. No-op when already running.
    pub fn start(&self) {
        let mut worker = self.worker();
        if self.is_running() {
            return;
        }
        // Reap a loop that stopped itself after too many errors.
        if let Some(stale) = worker.take() {
            stale.abort();
        }

        let period = self.refresh_interval();
        info!(interval_secs = period.as_secs(), "Starting live data synchronization");
        self.shared.status.send_modify(|status| {
            status.running = true;
            status.error_count = 0;
            status.connection = ConnectionStatus::Connecting;
        });

        let shared = self.shared.clone();
        *worker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if !shared.run_once().await {
                    break;
                }
            }
        }));
    }

    /// Change the time between passes, restarting the loop when it runs.
    pub async fn set_refresh_interval(&self, interval: Duration) -> Result<()> {
        *self.interval() = clamp_interval(interval);
        if self.is_running() {
            SyncService::stop(self).await?;
            self.start();
        }
        Ok(())
    }

    /// Run a pass right now, outside the interval. The minimum gap since the
    /// last successful pass still applies.
    pub async fn force_sync(&self) {
        debug!("Force sync requested");
        if !self.shared.run_once().await {
            let _ = SyncService::stop(self).await;
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.status.receiver_count()
    }
}

#[async_trait]
impl SyncService for LiveSync {
    fn is_running(&self) -> bool {
        self.shared.status.borrow().running
    }

    /// Cancels the loop task, dropping any pass still in flight.
    async fn stop(&self) -> Result<()> {
        let worker = self.worker().take();
        let joined = match worker {
            Some(handle) => {
                info!("Stopping live data synchronization");
                handle.abort();
                handle.await
            }
            None => Ok(()),
        };

        self.shared.status.send_if_modified(|status| {
            let changed = status.running || status.connection != ConnectionStatus::Disconnected;
            status.running = false;
            status.connection = ConnectionStatus::Disconnected;
            changed
        });

        match joined {
            Err(e) if !e.is_cancelled() => Err(e).context("Live sync task failed"),
            _ => Ok(()),
        }
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        if let Some(handle) = self.worker().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
