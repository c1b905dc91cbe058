//! API client for the ERP backend's session endpoints.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the logout endpoint, relative to the API base URL.
const LOGOUT_PATH: &str = "/auth/logout";

/// Server-side session revocation.
///
/// Implementations may fail for any reason (network, server); callers on the
/// forced-logout path treat failure as non-fatal.
#[async_trait]
pub trait ApiLogout: Send + Sync {
    async fn logout(&self) -> Result<()>;
}

/// API client for the ERP backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn logout_url(&self) -> String {
        format!("{}{}", self.base_url, LOGOUT_PATH)
    }

    async fn check_response(response: reqwest::Response) -> std::result::Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    /// Revoke the server-side session (and its refresh cookie).
    pub async fn revoke_session(&self) -> std::result::Result<(), ApiError> {
        let url = self.logout_url();
        let mut request = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        Self::check_response(response).await?;
        debug!(url = %url, "Server session revoked");
        Ok(())
    }
}

#[async_trait]
impl ApiLogout for ApiClient {
    async fn logout(&self) -> Result<()> {
        self.revoke_session().await?;
        Ok(())
    }
}
