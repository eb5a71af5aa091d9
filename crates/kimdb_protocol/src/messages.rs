//! Outbound realtime messages.

use crate::error::{ProtocolError, ProtocolResult};
use crate::JsonMap;
use serde::{Deserialize, Serialize};

/// A message sent from the client over the realtime channel.
///
/// Every message is a flat JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Subscribe to every document change in a collection.
    #[serde(rename = "subscribe")]
    Subscribe {
        /// Collection name.
        collection: String,
    },

    /// Subscribe to a single document.
    #[serde(rename = "doc.subscribe", rename_all = "camelCase")]
    SubscribeDocument {
        /// Collection name.
        collection: String,
        /// Document ID.
        doc_id: String,
    },

    /// Propagate a CRDT update for a document.
    #[serde(rename = "doc.update", rename_all = "camelCase")]
    UpdateDocument {
        /// Collection name.
        collection: String,
        /// Document ID.
        doc_id: String,
        /// Fields to merge into the document.
        data: JsonMap,
        /// Originating node.
        node_id: String,
    },

    /// Undo this node's last operation on a document.
    #[serde(rename = "doc.undo", rename_all = "camelCase")]
    Undo {
        /// Collection name.
        collection: String,
        /// Document ID.
        doc_id: String,
        /// Originating node.
        node_id: String,
    },

    /// Redo this node's last undone operation on a document.
    #[serde(rename = "doc.redo", rename_all = "camelCase")]
    Redo {
        /// Collection name.
        collection: String,
        /// Document ID.
        doc_id: String,
        /// Originating node.
        node_id: String,
    },

    /// Broadcast ephemeral presence state for a document.
    #[serde(rename = "presence.update", rename_all = "camelCase")]
    UpdatePresence {
        /// Collection name.
        collection: String,
        /// Document ID.
        doc_id: String,
        /// Originating node.
        node_id: String,
        /// Presence payload (cursor position, selection, ...).
        presence: JsonMap,
    },

    /// Keepalive.
    #[serde(rename = "ping")]
    Ping,
}

impl ClientMessage {
    /// Returns the wire `type` discriminator.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Subscribe { .. } => "subscribe",
            ClientMessage::SubscribeDocument { .. } => "doc.subscribe",
            ClientMessage::UpdateDocument { .. } => "doc.update",
            ClientMessage::Undo { .. } => "doc.undo",
            ClientMessage::Redo { .. } => "doc.redo",
            ClientMessage::UpdatePresence { .. } => "presence.update",
            ClientMessage::Ping => "ping",
        }
    }

    /// Returns the node ID attached to mutating messages.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            ClientMessage::UpdateDocument { node_id, .. }
            | ClientMessage::Undo { node_id, .. }
            | ClientMessage::Redo { node_id, .. }
            | ClientMessage::UpdatePresence { node_id, .. } => Some(node_id),
            _ => None,
        }
    }

    /// Encodes to a JSON text frame.
    pub fn encode(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::encoding(e.to_string()))
    }

    /// Decodes from a JSON text frame.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::malformed(e.to_string()))
    }
}
