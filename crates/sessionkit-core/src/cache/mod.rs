//! In-memory caching for UI data.
//!
//! This module provides the `EphemeralCache` for holding recently fetched
//! or computed values across view mount/unmount cycles. Every entry carries
//! its own time-to-live (60 seconds unless the caller says otherwise) and
//! expired entries are dropped lazily, the next time they are read.
//!
//! Time is read through the `Clock` trait so tests can drive expiry with a
//! `ManualClock` instead of sleeping.

pub mod clock;
pub mod ephemeral;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ephemeral::{CacheEntry, CacheStats, EphemeralCache, DEFAULT_TTL};
