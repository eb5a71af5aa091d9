//! Configuration for the HTTP client.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;

/// Configuration for a [`KimDbClient`](crate::KimDbClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL (e.g., "http://localhost:40000").
    pub base_url: String,
    /// Bearer token. Takes precedence over `api_key`.
    pub token: Option<String>,
    /// API key sent as `X-API-Key`.
    pub api_key: Option<String>,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a configuration with no credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            api_key: None,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the per-attempt request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the retry count, keeping the backoff unit.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry.retries = retries;
        self
    }

    /// Checks that the base URL is usable.
    pub fn validate(&self) -> ClientResult<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ClientError::InvalidConfig("base URL is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got {url:?}"
            )));
        }
        Ok(())
    }

    /// Joins the base URL and a request path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Headers attached to every request.
    ///
    /// `Content-Type` is always set. A non-empty token yields
    /// `Authorization: Bearer <token>`; otherwise a non-empty API key yields
    /// `X-API-Key`.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

        if let Some(token) = non_empty(&self.token) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        } else if let Some(key) = non_empty(&self.api_key) {
            headers.push(("X-API-Key".to_string(), key));
        }
        headers
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:40000")
    }
}

/// Configuration for retry behavior.
///
/// Backoff is linear: the wait before attempt `k` (0-indexed) is
/// `k * backoff_unit`, with no jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Backoff step.
    pub backoff_unit: Duration,
}

impl RetryConfig {
    /// Creates a configuration with the given retry count and a one-second step.
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the backoff step.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Total attempts, never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Calculates the wait before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
