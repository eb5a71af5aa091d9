//! HTTP transport.
//!
//! The actual HTTP library is abstracted via [`HttpClient`] so the retry and
//! decoding logic in [`KimDbClient`](crate::KimDbClient) can run against a
//! scripted [`MockHttpClient`] in tests.

use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase, if known.
    pub reason: Option<String>,
    /// Response body text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            reason: None,
            body: body.to_string(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implementations perform exactly one round trip per call. An `Err` means
/// no response was received (connection refused, DNS failure, timeout).
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the raw response.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// [`HttpClient`] backed by a blocking `reqwest` client.
///
/// The underlying connection pool lives as long as this value.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the given default timeout.
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .inner
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().map_err(|e| e.to_string())?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

/// A scripted [`HttpClient`] for testing.
///
/// Responses are returned in the order they were queued. Clones share the
/// same script and request log.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    state: Arc<MockState>,
}

impl MockHttpClient {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response.
    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.state
            .responses
            .lock()
            .push_back(Ok(HttpResponse::json(status, &body)));
        self
    }

    /// Queues a raw response.
    pub fn push_response(&self, response: HttpResponse) -> &Self {
        self.state.responses.lock().push_back(Ok(response));
        self
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.state.responses.lock().push_back(Err(message.into()));
        self
    }

    /// Returns every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.requests.lock().clone()
    }

    /// Returns the number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.state.requests.lock().len()
    }

    /// Returns the number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.state.responses.lock().len()
    }
}

impl HttpClient for MockHttpClient {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.state.requests.lock().push(request.clone());
        self.state
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err("no mock response queued".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: url.into(),
            headers: vec![("X-API-Key".into(), "k".into())],
            query: vec![],
            body: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn mock_replays_in_order() {
        let mock = MockHttpClient::new();
        mock.push_failure("connection refused")
            .push_json(200, json!({"status": "ok"}));

        assert_eq!(
            mock.send(&get("http://h/health")).unwrap_err(),
            "connection refused"
        );
        let response = mock.send(&get("http://h/health")).unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, r#"{"status":"ok"}"#);

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.remaining(), 0);
    }

    #[test]
    fn mock_without_script_fails() {
        let mock = MockHttpClient::new();
        assert!(mock.send(&get("http://h/health")).is_err());
    }

    #[test]
    fn clones_share_state() {
        let mock = MockHttpClient::new();
        let clone = mock.clone();
        clone.push_json(204, json!(null));

        mock.send(&get("http://h/x")).unwrap();
        assert_eq!(clone.request_count(), 1);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = get("http://h/x");
        assert_eq!(request.header("x-api-key"), Some("k"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn status_ranges() {
        assert!(HttpResponse::json(201, &json!({})).is_success());
        assert!(!HttpResponse::json(301, &json!({})).is_success());
        assert!(!HttpResponse::json(500, &json!({})).is_success());
        assert_eq!(Method::Post.as_str(), "POST");
    }
}
