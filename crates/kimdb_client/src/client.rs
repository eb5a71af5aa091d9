//! The KimDB HTTP client.

use crate::config::{ClientConfig, RetryConfig};
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient};
use kimdb_protocol::{
    count_statement, group_by_statement, Document, DocumentQuery, JsonMap, SqlRequest, SqlResponse,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Blocking client for the KimDB HTTP API.
///
/// Each call is one request/response round trip, retried per the configured
/// [`RetryConfig`]. The client owns its HTTP session; dropping it (or calling
/// [`close`](Self::close)) releases the session.
pub struct KimDbClient<C: HttpClient = ReqwestClient> {
    config: ClientConfig,
    headers: Vec<(String, String)>,
    http: C,
}

impl KimDbClient<ReqwestClient> {
    /// Creates a client backed by `reqwest`.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = ReqwestClient::new(config.timeout)?;
        Self::with_http_client(config, http)
    }
}

impl<C: HttpClient> KimDbClient<C> {
    /// Creates a client with a custom HTTP implementation.
    pub fn with_http_client(config: ClientConfig, http: C) -> ClientResult<Self> {
        config.validate()?;
        let headers = config.default_headers();
        Ok(Self {
            config,
            headers,
            http,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying HTTP client.
    pub fn http_client(&self) -> &C {
        &self.http
    }

    /// Sends a request and returns the decoded JSON body.
    ///
    /// Transport failures and non-2xx statuses are retried. An empty success
    /// body decodes to `Value::Null`.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(String, String)],
    ) -> ClientResult<Value> {
        let request = HttpRequest {
            method,
            url: self.config.url_for(path),
            headers: self.headers.clone(),
            query: query.to_vec(),
            body: body.cloned(),
            timeout: self.config.timeout,
        };

        run_with_retry(&self.config.retry, std::thread::sleep, |attempt| {
            debug!(
                method = method.as_str(),
                url = %request.url,
                attempt = attempt + 1,
                max_attempts = self.config.retry.max_attempts(),
                "sending request"
            );
            let response = self.http.send(&request).map_err(ClientError::transport)?;
            decode_response(response)
        })
    }

    /// Returns the server health report.
    pub fn health(&self) -> ClientResult<Value> {
        self.request(Method::Get, "/health", None, &[])
    }

    /// Returns server metrics.
    pub fn metrics(&self) -> ClientResult<Value> {
        self.request(Method::Get, "/api/metrics", None, &[])
    }

    /// Lists collection names.
    pub fn list_collections(&self) -> ClientResult<Vec<String>> {
        let response = self.request(Method::Get, "/api/collections", None, &[])?;
        match response.get("collections") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(names) => serde_json::from_value(names.clone())
                .map_err(|e| ClientError::Decode(format!("invalid collections list: {e}"))),
        }
    }

    /// Lists documents in a collection.
    ///
    /// Only the query parameters that are set are sent.
    pub fn get_collection(
        &self,
        collection: &str,
        query: Option<&DocumentQuery>,
    ) -> ClientResult<Value> {
        let params = query.map(DocumentQuery::to_query_params).unwrap_or_default();
        self.request(Method::Get, &format!("/api/c/{collection}"), None, &params)
    }

    /// Fetches one document.
    pub fn get_document(&self, collection: &str, id: &str) -> ClientResult<Document> {
        let response = self.request(Method::Get, &format!("/api/c/{collection}/{id}"), None, &[])?;
        Ok(Document::from_value(response)?)
    }

    /// Executes a SQL statement against a collection.
    ///
    /// `params` is sent only when non-empty.
    pub fn query(&self, sql: &str, collection: &str, params: &[Value]) -> ClientResult<Value> {
        let body = SqlRequest::new(sql, collection).with_params(params.to_vec());
        let body = serde_json::to_value(&body)
            .map_err(|e| ClientError::Decode(format!("failed to encode SQL request: {e}")))?;
        self.request(Method::Post, "/api/sql", Some(&body), &[])
    }

    /// Executes a SQL statement and returns its `rows`.
    pub fn query_rows(
        &self,
        sql: &str,
        collection: &str,
        params: &[Value],
    ) -> ClientResult<Vec<JsonMap>> {
        Ok(self.sql_response(sql, collection, params)?.rows)
    }

    /// Counts documents, optionally filtered.
    ///
    /// `where_clause` is inserted into the statement verbatim. It is not
    /// escaped.
    pub fn count(&self, collection: &str, where_clause: Option<&str>) -> ClientResult<u64> {
        let sql = count_statement(collection, where_clause);
        Ok(self.sql_response(&sql, collection, &[])?.total())
    }

    /// Counts documents per distinct value of `field`.
    pub fn group_by(&self, collection: &str, field: &str) -> ClientResult<BTreeMap<String, u64>> {
        let sql = group_by_statement(collection, field);
        Ok(self.sql_response(&sql, collection, &[])?.group_counts(field))
    }

    /// Closes the client and its HTTP session.
    pub fn close(self) {
        debug!(base_url = %self.config.base_url, "closing client");
    }

    fn sql_response(
        &self,
        sql: &str,
        collection: &str,
        params: &[Value],
    ) -> ClientResult<SqlResponse> {
        let response = self.query(sql, collection, params)?;
        Ok(SqlResponse::from_value(response)?)
    }
}

/// Turns a raw response into JSON or an error.
///
/// Non-2xx errors carry the body's `error` field when present, else the
/// reason phrase.
fn decode_response(response: HttpResponse) -> ClientResult<Value> {
    if !response.is_success() {
        let server_message = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string));
        let message = server_message
            .or(response.reason)
            .unwrap_or_else(|| format!("HTTP {}", response.status));
        return Err(ClientError::Http {
            status: response.status,
            message,
        });
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body)
        .map_err(|e| ClientError::Decode(format!("invalid JSON response: {e}")))
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `retry.max_attempts()` is reached. `sleep` is called between attempts
/// with the linear backoff delay.
pub(crate) fn run_with_retry<T, S, F>(retry: &RetryConfig, mut sleep: S, mut attempt: F) -> ClientResult<T>
where
    S: FnMut(Duration),
    F: FnMut(u32) -> ClientResult<T>,
{
    let max_attempts = retry.max_attempts();
    let mut last_error = None;

    for index in 0..max_attempts {
        if index > 0 {
            sleep(retry.delay_for_attempt(index));
        }
        match attempt(index) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if index + 1 < max_attempts {
                    warn!(
                        attempt = index + 1,
                        max_attempts,
                        backoff = ?retry.delay_for_attempt(index + 1),
                        error = %err,
                        "request failed, retrying"
                    );
                }
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    let err = last_error.unwrap_or(ClientError::Unknown);
    warn!(max_attempts, error = %err, "request failed, retries exhausted");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use proptest::prelude::*;
    use serde_json::json;

    fn client(mock: &MockHttpClient) -> KimDbClient<MockHttpClient> {
        let config = ClientConfig::new("http://localhost:40000")
            .with_api_key("k3y")
            .with_retry(RetryConfig::new(3).with_backoff_unit(Duration::ZERO));
        KimDbClient::with_http_client(config, mock.clone()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let result = KimDbClient::with_http_client(ClientConfig::new(""), MockHttpClient::new());
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn error_message_from_body() {
        let err = decode_response(HttpResponse {
            status: 404,
            reason: Some("Not Found".into()),
            body: r#"{"error":"Document not found"}"#.into(),
        })
        .unwrap_err();
        assert_eq!(
            err,
            ClientError::Http {
                status: 404,
                message: "Document not found".into()
            }
        );
    }

    #[test]
    fn error_message_falls_back_to_reason() {
        let err = decode_response(HttpResponse {
            status: 502,
            reason: Some("Bad Gateway".into()),
            body: "<html>upstream down</html>".into(),
        })
        .unwrap_err();
        assert_eq!(
            err,
            ClientError::Http {
                status: 502,
                message: "Bad Gateway".into()
            }
        );

        let err = decode_response(HttpResponse {
            status: 599,
            reason: None,
            body: String::new(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "server error (599): HTTP 599");
    }

    #[test]
    fn empty_success_body_is_null() {
        let value = decode_response(HttpResponse {
            status: 204,
            reason: None,
            body: String::new(),
        })
        .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn malformed_success_body_is_not_retried() {
        let mock = MockHttpClient::new();
        mock.push_response(HttpResponse {
            status: 200,
            reason: None,
            body: "{oops".into(),
        });
        mock.push_json(200, json!({"status": "ok"}));

        let err = client(&mock).health().unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn backoff_before_each_retry() {
        let retry = RetryConfig::new(3).with_backoff_unit(Duration::from_secs(1));
        let mut sleeps = Vec::new();
        let mut calls = 0;

        let result: ClientResult<()> = run_with_retry(
            &retry,
            |d| sleeps.push(d),
            |_| {
                calls += 1;
                Err(ClientError::transport(format!("refused #{calls}")))
            },
        );

        assert_eq!(calls, 4);
        assert_eq!(
            sleeps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
        assert_eq!(result.unwrap_err(), ClientError::transport("refused #4"));
    }

    #[test]
    fn zero_retries_attempts_once() {
        let mut calls = 0;
        let mut sleeps = 0;
        let result: ClientResult<u8> = run_with_retry(
            &RetryConfig::no_retry(),
            |_| sleeps += 1,
            |_| {
                calls += 1;
                Err(ClientError::Http {
                    status: 500,
                    message: "boom".into(),
                })
            },
        );

        assert_eq!(calls, 1);
        assert_eq!(sleeps, 0);
        assert_eq!(result.unwrap_err().status(), Some(500));
    }

    proptest! {
        #[test]
        fn retry_bound(retries in 0u32..6, extra in 0u32..3) {
            // `failures` ranges over 0..=retries+2 so both outcomes are covered
            let failures = (retries + extra).min(retries + 2);
            let retry = RetryConfig::new(retries).with_backoff_unit(Duration::from_millis(1));
            let mut sleeps = Vec::new();
            let mut calls = 0u32;

            let result = run_with_retry(&retry, |d| sleeps.push(d), |attempt| {
                calls += 1;
                if attempt < failures {
                    Err(ClientError::transport(format!("failure {attempt}")))
                } else {
                    Ok(attempt)
                }
            });

            prop_assert!(calls >= 1);
            prop_assert!(calls <= retries + 1);
            for (i, d) in sleeps.iter().enumerate() {
                prop_assert_eq!(*d, Duration::from_millis(i as u64 + 1));
            }

            if failures <= retries {
                prop_assert_eq!(result, Ok(failures));
                prop_assert_eq!(calls, failures + 1);
            } else {
                prop_assert_eq!(result, Err(ClientError::transport(format!("failure {retries}"))));
                prop_assert_eq!(calls, retries + 1);
            }
            prop_assert_eq!(sleeps.len() as u32, calls - 1);
        }
    }
}
