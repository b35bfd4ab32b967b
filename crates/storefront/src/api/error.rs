//! Errors produced by the transport and the API client.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// A request could not be delivered or its response could not be read.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connect, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Backend unreachable for a reason other than an HTTP error.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`ApiClient`](super::ApiClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend rejected the credentials and no refresh was possible.
    #[error("Unauthorized")]
    Unauthorized,

    /// Exchanging the refresh token failed; the session has been cleared.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Message extracted from the response body.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this error means the caller has no valid session.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::RefreshFailed(_))
    }

    /// Whether the request could be retried later without changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited(_) => true,
            Self::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Message suitable for a toast or inline error panel.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the store, check your connection".to_string(),
            Self::Unauthorized | Self::RefreshFailed(_) => {
                "Your session has expired, please sign in again".to_string()
            }
            Self::NotFound(_) => "Not found".to_string(),
            Self::RateLimited(secs) => format!("Too many requests, try again in {secs}s"),
            Self::Status { status, message } if status.is_client_error() => message.clone(),
            Self::Status { .. } | Self::Parse(_) => "Something went wrong on our side".to_string(),
        }
    }
}

/// Error payload shapes the backend uses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull a human-readable message out of an error response body.
pub(crate) fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.detail).or(parsed.error)
    {
        return message;
    }
    String::from_utf8_lossy(body).chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_fields() {
        assert_eq!(error_message(br#"{"message":"Out of stock"}"#), "Out of stock");
        assert_eq!(error_message(br#"{"detail":"Token expired"}"#), "Token expired");
        assert_eq!(error_message(br#"{"error":"bad"}"#), "bad");
    }

    #[test]
    fn test_error_message_falls_back_to_truncated_text() {
        let body = "x".repeat(500);
        assert_eq!(error_message(body.as_bytes()).len(), 200);
        assert_eq!(error_message(b"plain"), "plain");
    }

    #[test]
    fn test_user_message_hides_server_details() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "stack trace".to_string(),
        };
        assert_eq!(err.user_message(), "Something went wrong on our side");
        assert!(err.is_transient());

        let err = ApiError::Status {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Title is required".to_string(),
        };
        assert_eq!(err.user_message(), "Title is required");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_auth_failures() {
        assert!(ApiError::Unauthorized.is_auth_failure());
        assert!(ApiError::RefreshFailed("gone".into()).is_auth_failure());
        assert!(!ApiError::NotFound("x".into()).is_auth_failure());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::RateLimited(60).to_string(),
            "Rate limited, retry after 60 seconds"
        );
        assert_eq!(
            ApiError::NotFound("product 42".to_string()).to_string(),
            "Not found: product 42"
        );
    }
}
