//! Error types for the realtime channel.

use kimdb_protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors that can occur on the realtime channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// An outbound action was attempted while not connected.
    #[error("not connected to server")]
    NotConnected,

    /// The channel did not open within the connect timeout.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// Opening or using the transport failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// A message could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The channel configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
