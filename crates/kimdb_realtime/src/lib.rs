//! # KimDB Realtime
//!
//! WebSocket channel for KimDB collection and document subscriptions, CRDT
//! updates, undo/redo and presence.
//!
//! ## Threads
//!
//! `connect` blocks until the channel opens (or times out). After that:
//! - `kimdb-ws-recv` owns the socket, writes queued outbound frames, reads
//!   inbound frames and dispatches them to listeners
//! - `kimdb-ws-heartbeat` queues a `ping` every heartbeat interval until the
//!   connection ends
//!
//! Outbound actions only queue a frame; they fail with
//! [`RealtimeError::NotConnected`] unless the channel is connected. Errors on
//! the receive thread never reach the caller directly: they are delivered as
//! `error` events, followed by `disconnected` if the connection is lost.
//! There is no automatic reconnect.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kimdb_realtime::{EventKind, RealtimeClient, RealtimeConfig};
//!
//! let client = RealtimeClient::new(RealtimeConfig::new("ws://localhost:40000/ws"))?;
//! client.on(EventKind::DocSynced, |event| println!("{}", event.payload()));
//! client.connect()?;
//! client.subscribe_document("notes", "n1")?;
//! # Ok::<(), kimdb_realtime::RealtimeError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod listeners;
mod mock;
mod shutdown;
mod transport;

pub use client::{ConnectionState, RealtimeClient};
pub use config::{generate_node_id, RealtimeConfig};
pub use error::{RealtimeError, RealtimeResult};
pub use kimdb_protocol::{Event, EventKind, JsonMap};
pub use listeners::{Listener, ListenerRegistry};
pub use mock::{MockConnector, MockPeer};
pub use transport::{Connector, Frame, FrameTransport, TungsteniteConnector};
