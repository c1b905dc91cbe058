//! REST API client module for the ERP backend.
//!
//! Only the pieces the session layer needs live here: the `ApiLogout`
//! capability used by forced logout, the reqwest-backed `ApiClient` that
//! provides it, and the `ApiError` taxonomy whose `Unauthorized` variant is
//! what triggers a forced logout in the first place.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiLogout};
pub use error::ApiError;
