//! Error types for the orchestrator client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the orchestrator
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned a non-success status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from status code and response body
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Body of the failed response, when the orchestrator sent one
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::ApiError { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        let not_found = ClientError::api_error(404, r#"{"kind":"puppetlabs.orchestrator/unknown-job"}"#);
        assert!(not_found.is_not_found());
        assert!(not_found.is_client_error());
        assert!(!not_found.is_server_error());

        let unavailable = ClientError::api_error(503, "");
        assert!(unavailable.is_server_error());
        assert!(!unavailable.is_client_error());
    }

    #[test]
    fn test_response_body() {
        let err = ClientError::api_error(400, r#"{"msg":"bad scope"}"#);
        assert_eq!(err.response_body(), Some(r#"{"msg":"bad scope"}"#));

        assert_eq!(ClientError::api_error(502, "").response_body(), None);
        assert_eq!(ClientError::ParseError("eof".to_string()).response_body(), None);
    }
}
