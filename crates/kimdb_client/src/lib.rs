//! # KimDB Client
//!
//! Blocking HTTP client for a KimDB server.
//!
//! This crate provides:
//! - Typed calls for health, metrics, collections, documents and SQL
//! - `count` / `group_by` aggregates built on the SQL endpoint
//! - Bearer-token or API-key authentication
//! - Linear-backoff retry
//! - An `HttpClient` seam with a `reqwest` implementation and a mock
//!
//! ## Retry policy
//!
//! Every call is attempted up to `retries + 1` times (at least once). A
//! transport failure or any non-2xx status counts as transient; the wait
//! before attempt `k` is `k * backoff_unit`. When attempts run out the last
//! error is returned. Malformed success bodies are not retried.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kimdb_client::{ClientConfig, KimDbClient};
//!
//! let client = KimDbClient::new(
//!     ClientConfig::new("http://localhost:40000").with_api_key("secret"),
//! )?;
//! let users = client.count("users", Some("age > 21"))?;
//! println!("{users} adult users");
//! # Ok::<(), kimdb_client::ClientError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod http;

pub use client::KimDbClient;
pub use config::{ClientConfig, RetryConfig};
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, MockHttpClient, ReqwestClient};
pub use kimdb_protocol::{Document, DocumentQuery, JsonMap};

/// Client library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
