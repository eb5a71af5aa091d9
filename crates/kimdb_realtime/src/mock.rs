//! In-memory connector for testing.
//!
//! [`MockConnector`] hands out channel-backed sockets. Each accepted socket
//! has a [`MockPeer`] handle playing the server side: it pushes inbound
//! frames, observes what the client sent, and can close or break the
//! connection.

use crate::error::{RealtimeError, RealtimeResult};
use crate::transport::{Connector, Frame, FrameTransport};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Behavior {
    Accept,
    Refuse(String),
    Delay(Duration),
}

#[derive(Default)]
struct ConnectorState {
    attempts: usize,
    peers: Vec<MockPeer>,
}

struct ConnectorShared {
    behavior: Behavior,
    state: Mutex<ConnectorState>,
    changed: Condvar,
}

/// A [`Connector`] backed by in-memory sockets.
///
/// Clones share state, so a test can keep one clone while the client owns
/// another.
#[derive(Clone)]
pub struct MockConnector {
    shared: Arc<ConnectorShared>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Creates a connector that accepts every connection immediately.
    pub fn new() -> Self {
        Self::with_behavior(Behavior::Accept)
    }

    /// Creates a connector that refuses every connection with `message`.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Refuse(message.into()))
    }

    /// Creates a connector that accepts after sleeping for `delay`.
    pub fn delayed(delay: Duration) -> Self {
        Self::with_behavior(Behavior::Delay(delay))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            shared: Arc::new(ConnectorShared {
                behavior,
                state: Mutex::new(ConnectorState::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Returns how many connections were attempted.
    pub fn attempts(&self) -> usize {
        self.shared.state.lock().attempts
    }

    /// Returns the server side of the `index`-th accepted connection.
    pub fn peer(&self, index: usize) -> Option<MockPeer> {
        self.shared.state.lock().peers.get(index).cloned()
    }

    /// Returns the server side of the most recent accepted connection.
    pub fn last_peer(&self) -> Option<MockPeer> {
        self.shared.state.lock().peers.last().cloned()
    }

    /// Waits until the `index`-th connection has been accepted.
    pub fn wait_for_peer(&self, index: usize, timeout: Duration) -> Option<MockPeer> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.peers.len() <= index {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.peers.get(index).cloned()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        _url: &str,
        poll_interval: Duration,
    ) -> RealtimeResult<Box<dyn FrameTransport>> {
        self.shared.state.lock().attempts += 1;

        match &self.shared.behavior {
            Behavior::Accept => {}
            Behavior::Refuse(message) => return Err(RealtimeError::Connection(message.clone())),
            Behavior::Delay(delay) => thread::sleep(*delay),
        }

        let peer = MockPeer::new();
        let socket = MockSocket {
            peer: peer.clone(),
            poll_interval,
        };

        let mut state = self.shared.state.lock();
        state.peers.push(peer);
        self.shared.changed.notify_all();

        Ok(Box::new(socket))
    }
}

#[derive(Default)]
struct PeerState {
    inbound: VecDeque<Result<Frame, String>>,
    sent: Vec<String>,
    closed: bool,
}

#[derive(Default)]
struct PeerShared {
    state: Mutex<PeerState>,
    changed: Condvar,
}

/// The server side of a mock connection.
#[derive(Clone, Default)]
pub struct MockPeer {
    shared: Arc<PeerShared>,
}

impl MockPeer {
    fn new() -> Self {
        Self::default()
    }

    fn push(&self, item: Result<Frame, String>) {
        self.shared.state.lock().inbound.push_back(item);
        self.shared.changed.notify_all();
    }

    /// Delivers a text frame to the client.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(Frame::Text(text.into())));
    }

    /// Delivers a JSON message to the client.
    pub fn push_json(&self, message: &Value) {
        self.push_text(message.to_string());
    }

    /// Closes the connection from the server side.
    pub fn close(&self) {
        self.push(Ok(Frame::Close));
    }

    /// Makes the client's next read fail with `message`.
    pub fn fail(&self, message: impl Into<String>) {
        self.push(Err(message.into()));
    }

    /// Returns every frame the client sent, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.shared.state.lock().sent.clone()
    }

    /// Returns every sent frame that parses as JSON.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Waits until the client has sent at least `count` frames.
    pub fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.sent.len() < count {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.sent.len() >= count
    }

    /// Returns true once the client closed its socket.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Waits until the client closes its socket.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.closed {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.closed
    }
}

struct MockSocket {
    peer: MockPeer,
    poll_interval: Duration,
}

impl FrameTransport for MockSocket {
    fn poll_frame(&mut self) -> RealtimeResult<Option<Frame>> {
        let shared = &self.peer.shared;
        let mut state = shared.state.lock();
        if state.inbound.is_empty() && !state.closed {
            shared.changed.wait_for(&mut state, self.poll_interval);
        }
        match state.inbound.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(message)) => Err(RealtimeError::Connection(message)),
            None => Ok(None),
        }
    }

    fn send_text(&mut self, text: &str) -> RealtimeResult<()> {
        let shared = &self.peer.shared;
        let mut state = shared.state.lock();
        if state.closed {
            return Err(RealtimeError::Send("socket closed".into()));
        }
        state.sent.push(text.to_string());
        shared.changed.notify_all();
        Ok(())
    }

    fn close(&mut self) -> RealtimeResult<()> {
        let shared = &self.peer.shared;
        shared.state.lock().closed = true;
        shared.changed.notify_all();
        Ok(())
    }
}
