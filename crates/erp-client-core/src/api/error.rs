use std::time::Duration;

use thiserror::Error;

use super::request::HttpResponse;

/// Failure reported by a transport before any HTTP response arrived.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Transport timed out")]
    TimedOut,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::TimedOut
        } else if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else {
            TransportError::Http(e)
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    NetworkError(#[from] TransportError),

    #[error("Authentication failed - please log in again")]
    AuthenticationFailed,

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Build an `Api` error from a non-2xx response, preferring the
    /// server's `error` or `message` field over `default_message`.
    pub fn from_response(response: &HttpResponse, default_message: &str) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(&response.body)
            .ok()
            .and_then(|body| {
                ["error", "message"].iter().find_map(|field| {
                    body.get(*field)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| default_message.to_string());

        ApiError::Api {
            status: response.status.as_u16(),
            message,
        }
    }

    /// HTTP status for server-reported errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }

    /// True when the session was cleared and the user must log in again
    pub fn is_session_terminated(&self) -> bool {
        matches!(self, ApiError::AuthenticationFailed)
    }
}
