use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, warn};

/// The forced-logout steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    RemoteLogout,
    CredentialPurge,
    SyncHalt,
    Navigate,
    Notify,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::RemoteLogout,
        Step::CredentialPurge,
        Step::SyncHalt,
        Step::Navigate,
        Step::Notify,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::RemoteLogout => "remote_logout",
            Step::CredentialPurge => "credential_purge",
            Step::SyncHalt => "sync_halt",
            Step::Navigate => "navigate",
            Step::Notify => "notify",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// Nothing to do: the capability is absent or the effect already holds.
    Skipped(String),
    Failed(String),
}

impl StepStatus {
    pub fn skipped(why: &str) -> Self {
        StepStatus::Skipped(why.to_string())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            StepStatus::Completed => write!(f, "{:<17} ok", self.step),
            StepStatus::Skipped(why) => write!(f, "{:<17} skipped ({})", self.step, why),
            StepStatus::Failed(e) => write!(f, "{:<17} failed: {}", self.step, e),
        }
    }
}

/// What a single `terminate` call did.
#[derive(Debug, Clone, Serialize)]
pub struct TerminationReport {
    pub reason: String,
    /// Set when another termination was already running; no step ran.
    pub coalesced: bool,
    pub outcomes: Vec<StepOutcome>,
}

impl TerminationReport {
    pub(crate) fn coalesced(reason: String) -> Self {
        Self {
            reason,
            coalesced: true,
            outcomes: Vec::new(),
        }
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.outcome(step).map(|o| &o.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failed())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.outcomes.iter().map(|o| o.step).collect()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a synchronous collaborator call, turning a panic into an error.
pub(crate) fn guarded<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    std::panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))))
}

/// Run one step to completion and record how it went.
///
/// Errors and panics inside `work` are logged and captured in the outcome;
/// they never reach the caller.
pub(crate) async fn attempt<F>(step: Step, work: F) -> StepOutcome
where
    F: Future<Output = Result<StepStatus>>,
{
    let started = Instant::now();
    let status = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            warn!(step = %step, error = %format!("{:#}", e), "Termination step failed, continuing");
            StepStatus::Failed(format!("{:#}", e))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(step = %step, panic = %msg, "Termination step panicked, continuing");
            StepStatus::Failed(format!("panicked: {}", msg))
        }
    };
    let elapsed = started.elapsed();
    debug!(step = %step, ?status, elapsed_ms = elapsed.as_millis() as u64, "Termination step finished");
    StepOutcome {
        step,
        status,
        elapsed,
    }
}
