//! Inbound realtime events.
//!
//! The server sends flat JSON objects tagged by `type`. Known types are
//! decoded into [`Event`]; frames with an unknown or missing `type` decode to
//! `None` and are meant to be ignored by the caller.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::{json, Value};
use std::fmt;

/// Name under which listeners are registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The channel finished opening.
    Connected,
    /// The channel closed, from either side.
    Disconnected,
    /// A collection subscription was acknowledged.
    Subscribed,
    /// A document snapshot was pushed by the server.
    DocSynced,
    /// An update sent by this node was applied.
    DocUpdated,
    /// Another node changed its presence state.
    PresenceChanged,
    /// Keepalive reply.
    Pong,
    /// Server- or transport-reported error.
    Error,
    /// Caller-defined event name.
    Custom(String),
}

impl EventKind {
    /// Returns the wire name of the event.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Subscribed => "subscribed",
            EventKind::DocSynced => "doc.synced",
            EventKind::DocUpdated => "doc.updated",
            EventKind::PresenceChanged => "presence.changed",
            EventKind::Pong => "pong",
            EventKind::Error => "error",
            EventKind::Custom(name) => name,
        }
    }

    /// Maps a name to its kind. Unrecognized names become [`EventKind::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "connected" => EventKind::Connected,
            "disconnected" => EventKind::Disconnected,
            "subscribed" => EventKind::Subscribed,
            "doc.synced" => EventKind::DocSynced,
            "doc.updated" => EventKind::DocUpdated,
            "presence.changed" => EventKind::PresenceChanged,
            "pong" => EventKind::Pong,
            "error" => EventKind::Error,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed event delivered to listeners.
///
/// Payload fields are carried exactly as the server sent them; a field the
/// server left out is `Value::Null`. Use the accessors for typed reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The channel finished opening.
    Connected,
    /// The channel closed.
    Disconnected,
    /// A collection subscription was acknowledged.
    Subscribed {
        /// Subscribed collection.
        collection: Value,
    },
    /// A document snapshot was pushed by the server.
    DocSynced {
        /// Collection of the document.
        collection: Value,
        /// Document ID.
        doc_id: Value,
        /// Document payload.
        data: Value,
        /// Document version (`_version` on the wire).
        version: Value,
    },
    /// An update sent by this node was applied.
    DocUpdated {
        /// Document ID.
        doc_id: Value,
        /// Whether the server accepted the update.
        success: Value,
        /// Resulting document version (`_version` on the wire).
        version: Value,
    },
    /// Another node changed its presence state.
    PresenceChanged {
        /// Document ID.
        doc_id: Value,
        /// Node whose presence changed.
        node_id: Value,
        /// Presence payload.
        presence: Value,
    },
    /// Keepalive reply.
    Pong {
        /// Server timestamp.
        timestamp: Value,
    },
    /// Server- or transport-reported error.
    Error {
        /// Error message.
        message: String,
    },
    /// Caller-defined event.
    Custom {
        /// Event name.
        name: String,
        /// Arbitrary payload.
        payload: Value,
    },
}

impl Event {
    /// Returns the kind listeners for this event are registered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connected => EventKind::Connected,
            Event::Disconnected => EventKind::Disconnected,
            Event::Subscribed { .. } => EventKind::Subscribed,
            Event::DocSynced { .. } => EventKind::DocSynced,
            Event::DocUpdated { .. } => EventKind::DocUpdated,
            Event::PresenceChanged { .. } => EventKind::PresenceChanged,
            Event::Pong { .. } => EventKind::Pong,
            Event::Error { .. } => EventKind::Error,
            Event::Custom { name, .. } => EventKind::Custom(name.clone()),
        }
    }

    /// Returns the document ID if the event carries a string one.
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            Event::DocSynced { doc_id, .. }
            | Event::DocUpdated { doc_id, .. }
            | Event::PresenceChanged { doc_id, .. } => doc_id.as_str(),
            _ => None,
        }
    }

    /// Returns the document version if it is a non-negative integer.
    ///
    /// Integral floats such as `2.0` are accepted.
    pub fn version(&self) -> Option<u64> {
        let version = match self {
            Event::DocSynced { version, .. } | Event::DocUpdated { version, .. } => version,
            _ => return None,
        };
        version.as_u64().or_else(|| {
            version
                .as_f64()
                .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
                .map(|v| v as u64)
        })
    }

    /// Renders the event as its flat JSON payload
    /// (e.g. `{"docId": "d1", "success": true, "version": 2}`).
    pub fn payload(&self) -> Value {
        match self {
            Event::Connected | Event::Disconnected => json!({}),
            Event::Subscribed { collection } => json!({ "collection": collection }),
            Event::DocSynced {
                collection,
                doc_id,
                data,
                version,
            } => json!({
                "collection": collection,
                "docId": doc_id,
                "data": data,
                "version": version,
            }),
            Event::DocUpdated {
                doc_id,
                success,
                version,
            } => json!({ "docId": doc_id, "success": success, "version": version }),
            Event::PresenceChanged {
                doc_id,
                node_id,
                presence,
            } => json!({ "docId": doc_id, "nodeId": node_id, "presence": presence }),
            Event::Pong { timestamp } => json!({ "timestamp": timestamp }),
            Event::Error { message } => json!({ "message": message }),
            Event::Custom { payload, .. } => payload.clone(),
        }
    }
}

/// Decodes an inbound text frame.
///
/// Returns `Ok(None)` for well-formed frames whose `type` is unknown or
/// missing, and an error only for text that is not JSON.
pub fn decode_event(text: &str) -> ProtocolResult<Option<Event>> {
    let message: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::malformed(e.to_string()))?;

    let field = |name: &str| message.get(name).cloned().unwrap_or(Value::Null);

    let event = match message.get("type").and_then(Value::as_str) {
        Some("subscribed") => Event::Subscribed {
            collection: field("collection"),
        },
        Some("doc.synced") => Event::DocSynced {
            collection: field("collection"),
            doc_id: field("docId"),
            data: field("data"),
            version: field("_version"),
        },
        Some("doc.updated") => Event::DocUpdated {
            doc_id: field("docId"),
            success: field("success"),
            version: field("_version"),
        },
        Some("presence.changed") => Event::PresenceChanged {
            doc_id: field("docId"),
            node_id: field("nodeId"),
            presence: field("presence"),
        },
        Some("pong") => Event::Pong {
            timestamp: field("timestamp"),
        },
        Some("error") => Event::Error {
            message: match message.get("error") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => "Unknown error".to_string(),
                Some(other) => other.to_string(),
            },
        },
        _ => return Ok(None),
    };

    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_doc_updated() {
        let event = decode_event(r#"{"type":"doc.updated","docId":"d1","success":true,"_version":2}"#)
            .unwrap()
            .unwrap();

        assert_eq!(
            event,
            Event::DocUpdated {
                doc_id: json!("d1"),
                success: json!(true),
                version: json!(2),
            }
        );
        assert_eq!(
            event.payload(),
            json!({"docId": "d1", "success": true, "version": 2})
        );
        assert_eq!(event.doc_id(), Some("d1"));
        assert_eq!(event.version(), Some(2));
    }

    #[test]
    fn decode_doc_synced() {
        let event = decode_event(
            r#"{"type":"doc.synced","collection":"notes","docId":"n1","data":{"t":"x"},"_version":5}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(event.kind(), EventKind::DocSynced);
        assert_eq!(
            event.payload(),
            json!({"collection": "notes", "docId": "n1", "data": {"t": "x"}, "version": 5})
        );
    }

    #[test]
    fn decode_presence_subscribed_pong() {
        let event = decode_event(
            r#"{"type":"presence.changed","docId":"d","nodeId":"n2","presence":{"cursor":3}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            event.payload(),
            json!({"docId": "d", "nodeId": "n2", "presence": {"cursor": 3}})
        );

        let event = decode_event(r#"{"type":"subscribed","collection":"users"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            Event::Subscribed {
                collection: json!("users")
            }
        );

        let event = decode_event(r#"{"type":"pong","timestamp":1700000000000}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            Event::Pong {
                timestamp: json!(1_700_000_000_000i64)
            }
        );
    }

    #[test]
    fn payload_fields_pass_through_unchanged() {
        let event = decode_event(r#"{"type":"pong","timestamp":1700000000.5}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.payload(), json!({"timestamp": 1700000000.5}));

        let event = decode_event(r#"{"type":"pong","timestamp":"2024-01-01T00:00:00Z"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.payload(), json!({"timestamp": "2024-01-01T00:00:00Z"}));

        let event = decode_event(r#"{"type":"doc.updated","docId":42,"success":1,"_version":2.0}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event.payload(),
            json!({"docId": 42, "success": 1, "version": 2.0})
        );
        assert_eq!(event.doc_id(), None);
        assert_eq!(event.version(), Some(2));

        let event = decode_event(r#"{"type":"doc.synced","docId":"n1","_version":"7"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.payload()["version"], json!("7"));
        assert_eq!(event.version(), None);
    }

    #[test]
    fn decode_error_defaults_message() {
        let event = decode_event(r#"{"type":"error","error":"collection not found"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            Event::Error {
                message: "collection not found".into()
            }
        );

        let event = decode_event(r#"{"type":"error"}"#).unwrap().unwrap();
        assert_eq!(
            event,
            Event::Error {
                message: "Unknown error".into()
            }
        );
    }

    #[test]
    fn missing_fields_are_null() {
        let event = decode_event(r#"{"type":"doc.updated"}"#).unwrap().unwrap();
        assert_eq!(
            event.payload(),
            json!({"docId": null, "success": null, "version": null})
        );
        assert_eq!(event.version(), None);
    }

    #[test]
    fn unknown_or_missing_type_is_ignored() {
        assert_eq!(decode_event(r#"{"type":"server.stats","load":1}"#).unwrap(), None);
        assert_eq!(decode_event(r#"{"docId":"d1"}"#).unwrap(), None);
        assert_eq!(decode_event(r#"[1,2,3]"#).unwrap(), None);
        assert_eq!(decode_event(r#"{"type":42}"#).unwrap(), None);
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(matches!(
            decode_event("{not json"),
            Err(ProtocolError::MalformedJson { .. })
        ));
    }

    #[test]
    fn kind_names() {
        assert_eq!(EventKind::from_name("doc.updated"), EventKind::DocUpdated);
        assert_eq!(EventKind::PresenceChanged.to_string(), "presence.changed");
        assert_eq!(
            EventKind::from_name("cursor.moved"),
            EventKind::Custom("cursor.moved".into())
        );
        assert_eq!(EventKind::Custom("cursor.moved".into()).as_str(), "cursor.moved");
    }
}
