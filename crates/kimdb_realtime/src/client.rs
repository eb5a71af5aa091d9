//! Realtime channel client.

use crate::config::{generate_node_id, RealtimeConfig};
use crate::error::{RealtimeError, RealtimeResult};
use crate::listeners::ListenerRegistry;
use crate::shutdown::ShutdownSignal;
use crate::transport::{Connector, Frame, FrameTransport, TungsteniteConnector};
use kimdb_protocol::{decode_event, ClientMessage, Event, EventKind, JsonMap};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Lifecycle state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection. Initial state, and the state after any close.
    #[default]
    Disconnected,
    /// `connect` is waiting for the transport to open.
    Connecting,
    /// The transport is open; outbound actions are accepted.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

enum Outbound {
    Text(String),
    Close,
}

#[derive(Default)]
struct Session {
    state: ConnectionState,
    /// Bumped by every connect attempt; a receive thread only touches the
    /// session while its generation is current.
    generation: u64,
    outbound: Option<Sender<Outbound>>,
    shutdown: Option<ShutdownSignal>,
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    failure: Option<RealtimeError>,
}

struct Shared {
    session: Mutex<Session>,
    state_changed: Condvar,
    listeners: ListenerRegistry,
}

#[derive(Clone)]
struct LoopSettings {
    url: String,
    poll_interval: Duration,
    heartbeat_interval: Duration,
}

/// Client for the KimDB realtime channel.
///
/// One client owns at most one connection. Inbound frames are read on a
/// background thread (`kimdb-ws-recv`) which also delivers events to
/// listeners, so listeners must not block for long. A second thread
/// (`kimdb-ws-heartbeat`) queues a ping every heartbeat interval while
/// connected.
///
/// Dropping the client disconnects it.
pub struct RealtimeClient {
    config: RealtimeConfig,
    node_id: String,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
}

impl RealtimeClient {
    /// Creates a client that connects with `tungstenite`.
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        Self::with_connector(config, TungsteniteConnector)
    }

    /// Creates a client with a custom connector.
    pub fn with_connector<K>(config: RealtimeConfig, connector: K) -> RealtimeResult<Self>
    where
        K: Connector + 'static,
    {
        config.validate()?;
        let node_id = config.node_id.clone().unwrap_or_else(generate_node_id);

        Ok(Self {
            config,
            node_id,
            connector: Arc::new(connector),
            shared: Arc::new(Shared {
                session: Mutex::new(Session::default()),
                state_changed: Condvar::new(),
                listeners: ListenerRegistry::new(),
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Returns the node ID attached to mutating messages.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Returns the current lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.session.lock().state
    }

    /// Returns true while outbound actions are accepted.
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Registers a listener for `kind`.
    ///
    /// Listeners run on the receive thread, in registration order. A
    /// listener that panics is logged and skipped.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.listeners.register(kind, listener);
    }

    /// Delivers a caller-defined event to listeners registered under
    /// `EventKind::Custom(name)`, on the calling thread.
    pub fn emit_custom(&self, name: impl Into<String>, payload: Value) {
        let event = Event::Custom {
            name: name.into(),
            payload,
        };
        self.shared.listeners.dispatch(&event);
    }

    /// Connects using the configured timeout.
    pub fn connect(&self) -> RealtimeResult<()> {
        self.connect_with_timeout(self.config.connect_timeout)
    }

    /// Opens the channel and blocks until it is connected.
    ///
    /// Returns `Ok` immediately if already connected. Fails with
    /// [`RealtimeError::Timeout`] if the channel does not open within
    /// `timeout`, and with [`RealtimeError::Connection`] if opening fails.
    pub fn connect_with_timeout(&self, timeout: Duration) -> RealtimeResult<()> {
        let stale = {
            let mut session = self.shared.session.lock();
            match session.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    return Err(RealtimeError::Connection(
                        "a connect attempt is already in progress".into(),
                    ))
                }
                ConnectionState::Disconnected => {}
            }
            [session.reader.take(), session.heartbeat.take()]
        };
        // threads of a previous connection may still be finishing teardown
        join_all(stale);

        let mut session = self.shared.session.lock();
        if session.state != ConnectionState::Disconnected {
            return Err(RealtimeError::Connection(
                "a concurrent connect attempt won".into(),
            ));
        }
        session.generation += 1;
        session.state = ConnectionState::Connecting;
        session.failure = None;
        let generation = session.generation;

        let shared = Arc::clone(&self.shared);
        let connector = Arc::clone(&self.connector);
        let settings = LoopSettings {
            url: self.config.url.clone(),
            poll_interval: self.config.poll_interval,
            heartbeat_interval: self.config.heartbeat_interval,
        };
        let spawned = thread::Builder::new()
            .name("kimdb-ws-recv".into())
            .spawn(move || receive_loop(shared, connector, settings, generation));
        match spawned {
            Ok(handle) => session.reader = Some(handle),
            Err(e) => {
                session.state = ConnectionState::Disconnected;
                return Err(RealtimeError::Connection(format!(
                    "failed to spawn receive thread: {e}"
                )));
            }
        }
        debug!(url = %self.config.url, generation, "connecting");

        let deadline = Instant::now() + timeout;
        while session.generation == generation && session.state == ConnectionState::Connecting {
            if self
                .shared
                .state_changed
                .wait_until(&mut session, deadline)
                .timed_out()
            {
                break;
            }
        }

        if session.generation != generation {
            return Err(RealtimeError::Connection(
                "connect attempt was superseded".into(),
            ));
        }
        match session.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Connecting => {
                // the receive thread discards the transport if it opens later
                session.state = ConnectionState::Disconnected;
                session.reader = None;
                warn!(url = %self.config.url, ?timeout, "connect timed out");
                Err(RealtimeError::Timeout(timeout))
            }
            ConnectionState::Disconnected => {
                session.reader = None;
                Err(session.failure.take().unwrap_or_else(|| {
                    RealtimeError::Connection("connection closed while opening".into())
                }))
            }
        }
    }

    /// Closes the channel. Calling it when not connected is a no-op.
    ///
    /// Unless called from a listener, this waits for the receive thread to
    /// finish, so the `disconnected` event has been delivered on return.
    pub fn disconnect(&self) {
        let (previous, handles) = {
            let mut session = self.shared.session.lock();
            let previous = session.state;
            session.state = ConnectionState::Disconnected;
            if let Some(outbound) = session.outbound.take() {
                let _ = outbound.send(Outbound::Close);
            }
            if let Some(shutdown) = session.shutdown.take() {
                shutdown.cancel();
            }
            let handles = [session.reader.take(), session.heartbeat.take()];
            self.shared.state_changed.notify_all();
            (previous, handles)
        };

        match previous {
            ConnectionState::Connected => {
                info!(url = %self.config.url, "disconnecting");
                join_all(handles);
            }
            // a reader still opening its transport is left to discard it
            ConnectionState::Connecting => {}
            ConnectionState::Disconnected => join_all(handles),
        }
    }

    /// Subscribes to every change in `collection`.
    pub fn subscribe(&self, collection: &str) -> RealtimeResult<()> {
        self.send(ClientMessage::Subscribe {
            collection: collection.to_string(),
        })
    }

    /// Subscribes to a single document.
    pub fn subscribe_document(&self, collection: &str, doc_id: &str) -> RealtimeResult<()> {
        self.send(ClientMessage::SubscribeDocument {
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
        })
    }

    /// Sends a CRDT update for a document.
    pub fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        data: JsonMap,
    ) -> RealtimeResult<()> {
        self.send(ClientMessage::UpdateDocument {
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
            data,
            node_id: self.node_id.clone(),
        })
    }

    /// Undoes this node's last operation on a document.
    pub fn undo(&self, collection: &str, doc_id: &str) -> RealtimeResult<()> {
        self.send(ClientMessage::Undo {
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
            node_id: self.node_id.clone(),
        })
    }

    /// Redoes this node's last undone operation on a document.
    pub fn redo(&self, collection: &str, doc_id: &str) -> RealtimeResult<()> {
        self.send(ClientMessage::Redo {
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
            node_id: self.node_id.clone(),
        })
    }

    /// Broadcasts presence state for a document.
    pub fn update_presence(
        &self,
        collection: &str,
        doc_id: &str,
        presence: JsonMap,
    ) -> RealtimeResult<()> {
        self.send(ClientMessage::UpdatePresence {
            collection: collection.to_string(),
            doc_id: doc_id.to_string(),
            node_id: self.node_id.clone(),
            presence,
        })
    }

    fn send(&self, message: ClientMessage) -> RealtimeResult<()> {
        let session = self.shared.session.lock();
        if session.state != ConnectionState::Connected {
            return Err(RealtimeError::NotConnected);
        }
        let outbound = session.outbound.as_ref().ok_or(RealtimeError::NotConnected)?;

        let frame = message.encode()?;
        outbound
            .send(Outbound::Text(frame))
            .map_err(|_| RealtimeError::NotConnected)?;
        trace!(message_type = message.type_name(), "queued outbound message");
        Ok(())
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.config.url)
            .field("node_id", &self.node_id)
            .field("state", &self.connection_state())
            .finish()
    }
}

fn join_all<const N: usize>(handles: [Option<JoinHandle<()>>; N]) {
    let current = thread::current().id();
    for handle in handles.into_iter().flatten() {
        if handle.thread().id() == current {
            continue;
        }
        if handle.join().is_err() {
            warn!("realtime background thread panicked");
        }
    }
}

fn receive_loop(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    settings: LoopSettings,
    generation: u64,
) {
    let mut transport = match connector.connect(&settings.url, settings.poll_interval) {
        Ok(transport) => transport,
        Err(e) => {
            warn!(url = %settings.url, error = %e, "failed to open realtime channel");
            let mut session = shared.session.lock();
            if session.generation == generation && session.state == ConnectionState::Connecting {
                session.state = ConnectionState::Disconnected;
                session.failure = Some(e);
                shared.state_changed.notify_all();
            }
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel();
    let shutdown = ShutdownSignal::new();
    {
        let mut session = shared.session.lock();
        if session.generation != generation || session.state != ConnectionState::Connecting {
            drop(session);
            debug!(generation, "discarding connection opened after connect gave up");
            let _ = transport.close();
            return;
        }
        session.state = ConnectionState::Connected;
        session.outbound = Some(outbound_tx.clone());
        session.shutdown = Some(shutdown.clone());
    }
    info!(url = %settings.url, "realtime channel connected");

    let heartbeat = {
        let shutdown = shutdown.clone();
        let interval = settings.heartbeat_interval;
        thread::Builder::new()
            .name("kimdb-ws-heartbeat".into())
            .spawn(move || heartbeat_loop(outbound_tx, shutdown, interval))
    };
    match heartbeat {
        Ok(handle) => {
            let mut session = shared.session.lock();
            if session.generation == generation {
                session.heartbeat = Some(handle);
            }
        }
        Err(e) => warn!(error = %e, "failed to spawn heartbeat thread"),
    }

    shared.listeners.dispatch(&Event::Connected);
    shared.state_changed.notify_all();

    pump(&shared, transport.as_mut(), &outbound_rx);

    shutdown.cancel();
    if let Err(e) = transport.close() {
        debug!(error = %e, "error closing transport");
    }
    {
        let mut session = shared.session.lock();
        if session.generation == generation {
            session.state = ConnectionState::Disconnected;
            session.outbound = None;
            session.shutdown = None;
        }
        shared.state_changed.notify_all();
    }
    info!(url = %settings.url, "realtime channel disconnected");
    shared.listeners.dispatch(&Event::Disconnected);
}

/// Alternates between flushing queued frames and reading inbound ones until
/// either side closes.
fn pump(shared: &Shared, transport: &mut dyn FrameTransport, outbound: &Receiver<Outbound>) {
    loop {
        loop {
            match outbound.try_recv() {
                Ok(Outbound::Text(frame)) => {
                    if let Err(e) = transport.send_text(&frame) {
                        warn!(error = %e, "failed to send frame");
                        shared.listeners.dispatch(&Event::Error {
                            message: e.to_string(),
                        });
                    }
                }
                Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => break,
            }
        }

        match transport.poll_frame() {
            Ok(None) => {}
            Ok(Some(Frame::Text(text))) => handle_text(shared, &text),
            Ok(Some(Frame::Close)) => {
                debug!("server closed the channel");
                return;
            }
            Err(e) => {
                warn!(error = %e, "realtime read failed");
                shared.listeners.dispatch(&Event::Error {
                    message: e.to_string(),
                });
                return;
            }
        }
    }
}

fn handle_text(shared: &Shared, text: &str) {
    match decode_event(text) {
        Ok(Some(event)) => {
            trace!(event = %event.kind(), "received event");
            shared.listeners.dispatch(&event);
        }
        Ok(None) => trace!("ignoring message with unknown type"),
        Err(e) => warn!(error = %e, "dropping malformed frame"),
    }
}

fn heartbeat_loop(outbound: Sender<Outbound>, shutdown: ShutdownSignal, interval: Duration) {
    while !shutdown.wait_timeout(interval) {
        let frame = match ClientMessage::Ping.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode ping");
                continue;
            }
        };
        if outbound.send(Outbound::Text(frame)).is_err() {
            break;
        }
        trace!("queued ping");
    }
    debug!("heartbeat stopped");
}
