//! Model backend failures and their classification.
//!
//! A [`BackendError`] is always surfaced to the caller as-is. Transient
//! failures (429, 500, 502, 503, 504, network timeouts) are flagged so the
//! caller can offer a retry; 400/401/403/404/422 and configuration problems
//! are permanent.

use thiserror::Error;

/// HTTP statuses worth trying again.
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Why a model backend call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Request(String),
    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The backend answered 200 but reported an error in the body.
    #[error("API error: {0}")]
    Api(String),
    /// The response envelope could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// The client is missing a key, URL, or similar setting.
    #[error("backend misconfigured: {0}")]
    Config(String),
    /// The backend does not offer the requested capability.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl BackendError {
    /// Whether trying the same call again later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Request(msg) => {
                let lower = msg.to_lowercase();
                [
                    "connection reset",
                    "connection refused",
                    "connection closed",
                    "timed out",
                    "timeout",
                    "broken pipe",
                    "network",
                    "dns",
                    "error sending request",
                    "failed to read response",
                ]
                .iter()
                .any(|p| lower.contains(p))
            }
            BackendError::Http { status, .. } => TRANSIENT_STATUSES.contains(status),
            BackendError::Api(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("rate limit") || lower.contains("overloaded")
            }
            BackendError::Decode(_) | BackendError::Config(_) | BackendError::Unsupported(_) => {
                false
            }
        }
    }

    /// Failure for a non-success status. A body that could not be read is
    /// described in its place so the status is kept.
    pub fn http<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> Self {
        let body = body.unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        BackendError::Http { status, body }
    }

    /// HTTP status, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
