//! Error types for the HTTP client.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network failure: connection refused, DNS, timeout.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("server error ({status}): {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-provided `error` field, or the reason phrase.
        message: String,
    },

    /// A success response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Retries ended without any recorded cause.
    #[error("unknown error")]
    Unknown,
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// All non-2xx statuses are retried alike, including ones that will
    /// never succeed (e.g. 400 or 404).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport { .. } | ClientError::Http { .. })
    }

    /// Returns the HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<kimdb_protocol::ProtocolError> for ClientError {
    fn from(err: kimdb_protocol::ProtocolError) -> Self {
        ClientError::Decode(err.to_string())
    }
}
