//! Integration tests for the HTTP client against a scripted transport.

use kimdb_client::{
    ClientConfig, ClientError, DocumentQuery, KimDbClient, Method, MockHttpClient, RetryConfig,
};
use serde_json::json;
use std::time::Duration;

fn client_with(mock: &MockHttpClient, retries: u32) -> KimDbClient<MockHttpClient> {
    let config = ClientConfig::new("http://localhost:40000/")
        .with_token("jwt-token")
        .with_retry(RetryConfig::new(retries).with_backoff_unit(Duration::ZERO));
    KimDbClient::with_http_client(config, mock.clone()).unwrap()
}

#[test]
fn health_and_metrics_pass_through() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"status": "ok", "uptime": 12}))
        .push_json(200, json!({"success": true, "requests": {"total": 4}}));
    let client = client_with(&mock, 0);

    assert_eq!(client.health().unwrap()["uptime"], json!(12));
    assert_eq!(client.metrics().unwrap()["requests"]["total"], json!(4));

    let requests = mock.requests();
    assert_eq!(requests[0].url, "http://localhost:40000/health");
    assert_eq!(requests[1].url, "http://localhost:40000/api/metrics");
    assert!(requests.iter().all(|r| r.method == Method::Get));
}

#[test]
fn every_request_carries_headers() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({}));
    client_with(&mock, 0).health().unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.header("Authorization"), Some("Bearer jwt-token"));
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    assert_eq!(request.header("X-API-Key"), None);
    assert_eq!(request.timeout, Duration::from_secs(30));
}

#[test]
fn list_collections_defaults_to_empty() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"collections": ["users", "notes"]}))
        .push_json(200, json!({"success": true}));
    let client = client_with(&mock, 0);

    assert_eq!(client.list_collections().unwrap(), vec!["users", "notes"]);
    assert!(client.list_collections().unwrap().is_empty());
}

#[test]
fn get_collection_sends_only_set_params() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"data": []}))
        .push_json(200, json!({"data": []}));
    let client = client_with(&mock, 0);

    client.get_collection("users", None).unwrap();
    let query = DocumentQuery::new().with_limit(10).with_sort("name");
    client.get_collection("users", Some(&query)).unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].url, "http://localhost:40000/api/c/users");
    assert!(requests[0].query.is_empty());
    assert_eq!(
        requests[1].query,
        vec![
            ("limit".to_string(), "10".to_string()),
            ("sort".to_string(), "name".to_string()),
        ]
    );
}

#[test]
fn get_document_maps_fields() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"id": "a", "data": {"x": 1}, "_version": 3}));
    let client = client_with(&mock, 0);

    let doc = client.get_document("users", "a").unwrap();
    assert_eq!(doc.id, "a");
    assert_eq!(doc.data.get("x"), Some(&json!(1)));
    assert_eq!(doc.version, 3);
    assert_eq!(doc.created, None);
    assert_eq!(doc.updated, None);
    assert_eq!(mock.requests()[0].url, "http://localhost:40000/api/c/users/a");
}

#[test]
fn get_document_requires_fields() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"id": "a", "data": {"x": 1}}));
    let client = client_with(&mock, 3);

    let err = client.get_document("users", "a").unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    // decoding failures are not retried
    assert_eq!(mock.request_count(), 1);
}

#[test]
fn query_body_shape() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"rows": []}))
        .push_json(200, json!({"rows": [{"name": "Bob"}]}));
    let client = client_with(&mock, 0);

    client.query("SELECT * FROM users", "users", &[]).unwrap();
    let rows = client
        .query_rows("SELECT * FROM users WHERE age > ?", "users", &[json!(30)])
        .unwrap();
    assert_eq!(rows[0]["name"], json!("Bob"));

    let requests = mock.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "http://localhost:40000/api/sql");
    assert_eq!(
        requests[0].body,
        Some(json!({"sql": "SELECT * FROM users", "collection": "users"}))
    );
    assert_eq!(
        requests[1].body,
        Some(json!({
            "sql": "SELECT * FROM users WHERE age > ?",
            "collection": "users",
            "params": [30],
        }))
    );
}

#[test]
fn count_reads_total() {
    let mock = MockHttpClient::new();
    mock.push_json(200, json!({"rows": [{"total": 7}]}))
        .push_json(200, json!({"rows": []}));
    let client = client_with(&mock, 0);

    assert_eq!(client.count("users", None).unwrap(), 7);
    assert_eq!(client.count("users", Some("role = 'admin'")).unwrap(), 0);

    let requests = mock.requests();
    assert_eq!(
        requests[0].body.as_ref().unwrap()["sql"],
        json!("SELECT COUNT(*) as total FROM users")
    );
    assert_eq!(
        requests[1].body.as_ref().unwrap()["sql"],
        json!("SELECT COUNT(*) as total FROM users WHERE role = 'admin'")
    );
}

#[test]
fn group_by_folds_rows() {
    let mock = MockHttpClient::new();
    mock.push_json(
        200,
        json!({"rows": [{"role": "admin", "count": 2}, {"role": "user", "count": 5}]}),
    );
    let client = client_with(&mock, 0);

    let groups = client.group_by("users", "role").unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups["admin"], 2);
    assert_eq!(groups["user"], 5);
    assert_eq!(
        mock.requests()[0].body.as_ref().unwrap()["sql"],
        json!("SELECT role, COUNT(*) as count FROM users GROUP BY role")
    );
}

#[test]
fn transient_failures_within_budget_succeed() {
    let mock = MockHttpClient::new();
    mock.push_failure("connection refused")
        .push_json(503, json!({"error": "warming up"}))
        .push_failure("timed out")
        .push_json(200, json!({"status": "ok"}));
    let client = client_with(&mock, 3);

    assert_eq!(client.health().unwrap()["status"], json!("ok"));
    assert_eq!(mock.request_count(), 4);
}

#[test]
fn exhausted_retries_return_last_error() {
    let mock = MockHttpClient::new();
    mock.push_failure("connection refused")
        .push_json(500, json!({"error": "disk full"}))
        .push_json(200, json!({"status": "ok"}));
    let client = client_with(&mock, 1);

    let err = client.health().unwrap_err();
    assert_eq!(
        err,
        ClientError::Http {
            status: 500,
            message: "disk full".into()
        }
    );
    assert_eq!(mock.request_count(), 2);
    assert_eq!(mock.remaining(), 1);
}

#[test]
fn non_retryable_status_is_still_retried() {
    let mock = MockHttpClient::new();
    mock.push_json(404, json!({"error": "Document not found"}))
        .push_json(404, json!({"error": "Document not found"}));
    let client = client_with(&mock, 1);

    let err = client.get_document("users", "missing").unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn close_consumes_client() {
    let mock = MockHttpClient::new();
    let client = client_with(&mock, 0);
    client.close();
    assert_eq!(mock.request_count(), 0);
}
