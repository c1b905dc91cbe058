//! sessionkit-core: client-side session lifecycle for the ERP web client.
//!
//! This crate provides:
//! - `EphemeralCache`: TTL-bounded in-memory cache for UI data
//! - `SessionTerminator`: best-effort forced logout that always ends on the
//!   login view
//! - The collaborators forced logout drives (API client, credential stores,
//!   live sync, navigator, event bus), each behind a small trait
//! - `Config` and `SessionContext` for one-time startup wiring

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod events;
pub mod nav;
pub mod sync;
pub mod terminate;

pub use api::{ApiClient, ApiError, ApiLogout};
pub use auth::{CredentialStore, KeychainCredentials, SessionFile, StoredSession, UserProfile};
pub use cache::{CacheStats, Clock, EphemeralCache, ManualClock, SystemClock, DEFAULT_TTL};
pub use config::{Config, CredentialBackend};
pub use context::SessionContext;
pub use events::{EventBus, EventSink, TerminationEvent};
pub use nav::{MemoryNavigator, Navigator};
pub use sync::{LiveSync, SyncConfig, SyncService, SyncSource, SyncStatus};
pub use terminate::{SessionTerminator, Step, StepOutcome, StepStatus, TerminationReport};
