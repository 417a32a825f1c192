//! Job client contract and its HTTP implementation

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::OrchestratorClient;
use crate::error::Result;

/// The two orchestrator operations the dispatcher needs
///
/// Implementations return the parsed body of a successful (2xx) response and
/// an error for anything else. Endpoints are relative to the orchestrator's
/// base URL, e.g. `command/deploy` or `jobs/42`.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Creates a remote job by posting `payload` to a command endpoint
    async fn submit(&self, endpoint: &str, payload: &JsonValue) -> Result<JsonValue>;

    /// Reads the current state of a remote job
    async fn poll(&self, endpoint: &str) -> Result<JsonValue>;
}

#[async_trait]
impl JobClient for OrchestratorClient {
    async fn submit(&self, endpoint: &str, payload: &JsonValue) -> Result<JsonValue> {
        let url = self.url(endpoint);
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(payload)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn poll(&self, endpoint: &str) -> Result<JsonValue> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use std::time::Duration;

    fn unreachable_client() -> OrchestratorClient {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        // Port 9 (discard) on loopback is not expected to accept connections.
        OrchestratorClient::with_client("http://127.0.0.1:9/orchestrator/v1", http)
    }

    #[tokio::test]
    async fn test_submit_transport_failure_is_request_failed() {
        let client = unreachable_client();
        let err = client
            .submit("command/deploy", &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::RequestFailed(_)));
        assert_eq!(err.response_body(), None);
    }

    #[tokio::test]
    async fn test_poll_transport_failure_is_request_failed() {
        let client = unreachable_client();
        let err = client.poll("jobs/1").await.unwrap_err();

        assert!(matches!(err, ClientError::RequestFailed(_)));
    }
}
