//! Relay HTTP Client
//!
//! A small HTTP client for the orchestrator's command and job endpoints.
//!
//! The agent only needs two operations from the orchestrator: submit a command
//! and read a job. Both are expressed by the [`JobClient`] trait so the
//! dispatcher can be driven by anything that speaks that contract; the
//! [`OrchestratorClient`] is the reqwest-backed implementation.
//!
//! # Example
//!
//! ```no_run
//! use relay_client::{JobClient, OrchestratorClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relay_client::ClientError> {
//!     let client = OrchestratorClient::new("https://pe.example.com:8143/orchestrator/v1")
//!         .with_token("0123abcd");
//!
//!     let job = client.poll("jobs/42").await?;
//!     println!("job 42 is {}", job["state"]);
//!     Ok(())
//! }
//! ```

pub mod error;
mod job_client;

pub use error::{ClientError, Result};
pub use job_client::JobClient;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the orchestrator's RBAC token
pub const AUTH_HEADER: &str = "X-Authentication";

/// HTTP client for the orchestrator API
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "https://pe.example.com:8143/orchestrator/v1")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Token sent in the authentication header, if any
    token: Option<String>,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use relay_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("http://localhost:8143/orchestrator/v1");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use relay_client::OrchestratorClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = OrchestratorClient::with_client("http://localhost:8143", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    /// Send `token` in the authentication header of every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint relative to the base URL
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTH_HEADER, token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success status codes become [`ClientError::ApiError`] carrying the
    /// response body.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
