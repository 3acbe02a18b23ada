//! Error types for the Jellyfin client

use thiserror::Error;

/// Result type alias for Jellyfin operations
pub type Result<T> = std::result::Result<T, JellyfinError>;

/// Errors that can occur when talking to a Jellyfin server
#[derive(Error, Debug)]
pub enum JellyfinError {
    /// Authentication failed (invalid credentials or expired token)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Resource not found (item, endpoint, etc.)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Server address did not parse as a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Server address parsed but is not usable (bad scheme, missing host)
    #[error("Invalid server address: {0}")]
    InvalidServer(String),

    /// The server answered with a non-success status
    #[error("Server error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl JellyfinError {
    /// Creates an API error from an HTTP status code and a message
    pub fn from_status_code(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }

    /// Whether the error is a credentials problem (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, JellyfinError::Unauthorized(_))
    }

    /// The server-supplied message for a non-success exchange, if this error
    /// carries one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            JellyfinError::Unauthorized(m)
            | JellyfinError::NotFound(m)
            | JellyfinError::Api { message: m, .. } => Some(m),
            _ => None,
        }
    }
}
