//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input was not valid JSON.
    #[error("malformed JSON: {message}")]
    MalformedJson {
        /// Parser error description.
        message: String,
    },

    /// JSON was valid but did not have the expected shape.
    #[error("invalid message structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Failed to serialize an outbound message.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },
}

impl ProtocolError {
    /// Creates a malformed JSON error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJson {
            message: message.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::malformed("expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "malformed JSON: expected value at line 1 column 1"
        );

        let err = ProtocolError::invalid_structure("missing field `id`");
        assert!(err.to_string().contains("missing field `id`"));
    }
}
