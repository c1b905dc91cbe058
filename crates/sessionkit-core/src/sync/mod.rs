//! Background live-data synchronization.
//!
//! `LiveSync` periodically pulls fresh data through a `SyncSource` while a
//! session is signed in and publishes its status to subscribers. Forced
//! logout only needs the `SyncService` capability: stop, which cancels the
//! loop without waiting for a pass in flight.

pub mod live;

pub use live::{ConnectionStatus, LiveSync, SyncConfig, SyncService, SyncSource, SyncStatus};
