//! Forced logout.
//!
//! `SessionTerminator` collapses a signed-in session to a logged-out state
//! on the login view. It runs a fixed sequence of steps (remote logout,
//! credential purge, sync halt, navigation, notification); each step goes
//! through the same `attempt` wrapper, so a failure or panic in one is
//! logged and recorded in the `TerminationReport` while the rest still run.

pub mod step;
pub mod terminator;

pub use step::{Step, StepOutcome, StepStatus, TerminationReport};
pub use terminator::{
    SessionTerminator, TerminationState, DEFAULT_LOGIN_PATH, DEFAULT_LOGIN_ROUTE, DEFAULT_REASON,
};
