//! Error types for the ARI control-plane client

use thiserror::Error;

/// Result type for control-plane operations
pub type AriResult<T> = Result<T, AriError>;

/// Errors that can occur while talking to the call-control server
#[derive(Debug, Error)]
pub enum AriError {
    /// Transport-level HTTP failure (connection refused, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server does not know the requested resource
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The server answered with a non-success status
    #[error("control plane returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Event WebSocket failure
    #[error("event stream error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A payload could not be decoded
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The control plane cannot serve requests right now
    #[error("control plane unavailable: {message}")]
    Unavailable { message: String },
}

impl AriError {
    /// Create a not-found error for a resource description
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the server reported the resource as gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
