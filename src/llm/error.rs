//! Typed errors for chat model requests
//!
//! Lets the optimizer tell a cancelled request apart from a broken one
//! without string matching.

use thiserror::Error;

/// Chat model request errors
///
/// - `Unauthorized` (401) - missing or rejected API key
/// - `RateLimited` (429) - quota exceeded
/// - `BadRequest` (400) - malformed request or unknown model
/// - `ServiceError` (5xx) - server-side issue
/// - `Network` - connection refused, timeout, broken stream
/// - `Cancelled` - the caller's cancellation token fired
/// - `Other` - catch-all
#[derive(Debug, Error)]
pub enum LlmError {
    /// Authentication token is missing or invalid (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Network connectivity issue or a stream that broke mid-way
    #[error("Network error: {0}")]
    Network(String),

    /// The request was cancelled before the response completed
    #[error("Request cancelled")]
    Cancelled,

    /// Other errors not fitting the above categories
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether this error came from the caller cancelling the request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LlmError::Cancelled)
    }

    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            let error_text = e.to_string();
            Self::from_http_status(status, error_text)
        } else {
            LlmError::Other(e.into())
        }
    }
}
