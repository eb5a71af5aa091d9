//! # KimDB Protocol
//!
//! Wire types and JSON codecs shared by the KimDB client crates.
//!
//! This crate provides:
//! - `Document` snapshots and `DocumentQuery` transport parameters
//! - `SqlRequest` / `SqlResponse` bodies for the `/api/sql` endpoint
//! - Outbound realtime messages (`ClientMessage`)
//! - Inbound realtime frame decoding into typed `Event`s
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod event;
mod messages;
mod sql;

pub use document::{Document, DocumentQuery};
pub use error::{ProtocolError, ProtocolResult};
pub use event::{decode_event, Event, EventKind};
pub use messages::ClientMessage;
pub use sql::{count_statement, group_by_statement, SqlRequest, SqlResponse};

/// JSON object type used for document data and presence payloads.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
