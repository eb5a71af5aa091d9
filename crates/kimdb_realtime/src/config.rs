//! Configuration for the realtime channel.

use crate::error::{RealtimeError, RealtimeResult};
use std::time::Duration;
use uuid::Uuid;

/// Configuration for a [`RealtimeClient`](crate::RealtimeClient).
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket URL (e.g., "ws://localhost:40000/ws").
    pub url: String,
    /// Node ID attached to mutating messages. Generated when `None`.
    pub node_id: Option<String>,
    /// How long `connect` waits for the channel to open.
    pub connect_timeout: Duration,
    /// Keepalive ping interval.
    pub heartbeat_interval: Duration,
    /// How long the receive loop blocks on a read before servicing
    /// outbound frames.
    pub poll_interval: Duration,
}

impl RealtimeConfig {
    /// Creates a configuration with a generated node ID.
    ///
    /// Surrounding whitespace is trimmed from the URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim().to_string(),
            node_id: None,
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Sets the node ID.
    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the keepalive interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the receive poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Checks the URL scheme and intervals.
    pub fn validate(&self) -> RealtimeResult<()> {
        let url = self.url.as_str();
        let ws_scheme = url.starts_with("ws://") || url.starts_with("wss://");
        if !ws_scheme || url.contains(char::is_whitespace) {
            return Err(RealtimeError::InvalidConfig(format!(
                "URL must be a ws:// or wss:// URL without whitespace, got {url:?}"
            )));
        }
        if self.node_id.as_deref() == Some("") {
            return Err(RealtimeError::InvalidConfig("node ID is empty".into()));
        }
        if self.heartbeat_interval.is_zero() || self.poll_interval.is_zero() {
            return Err(RealtimeError::InvalidConfig(
                "heartbeat and poll intervals must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Generates a node ID of the form `client-<uuid>`.
pub fn generate_node_id() -> String {
    format!("client-{}", Uuid::new_v4().simple())
}
