//! Transport layer abstraction for the realtime channel.
//!
//! The receive loop owns one [`FrameTransport`] for the lifetime of a
//! connection and alternates between reading (bounded by the poll interval)
//! and writing queued outbound frames, so a transport never needs to be
//! shared between threads.

use crate::error::{RealtimeError, RealtimeResult};
use std::io;
use std::net::TcpStream;
use std::time::Duration;
use tracing::debug;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// A frame read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame.
    Text(String),
    /// The peer closed the connection.
    Close,
}

/// A connected, bidirectional text-frame transport.
pub trait FrameTransport: Send {
    /// Waits up to the poll interval for the next frame.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn poll_frame(&mut self) -> RealtimeResult<Option<Frame>>;

    /// Writes one text frame.
    fn send_text(&mut self, text: &str) -> RealtimeResult<()>;

    /// Closes the transport. Closing twice is not an error.
    fn close(&mut self) -> RealtimeResult<()>;
}

/// Opens transports.
pub trait Connector: Send + Sync {
    /// Opens a transport whose reads block for at most `poll_interval`.
    fn connect(&self, url: &str, poll_interval: Duration)
        -> RealtimeResult<Box<dyn FrameTransport>>;
}

/// [`Connector`] for `ws://` and `wss://` URLs backed by `tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(
        &self,
        url: &str,
        poll_interval: Duration,
    ) -> RealtimeResult<Box<dyn FrameTransport>> {
        let (mut socket, response) =
            tungstenite::connect(url).map_err(|e| RealtimeError::Connection(e.to_string()))?;
        debug!(url, status = response.status().as_u16(), "websocket handshake complete");

        set_read_timeout(&mut socket, poll_interval)
            .map_err(|e| RealtimeError::Connection(format!("failed to set read timeout: {e}")))?;

        Ok(Box::new(TungsteniteTransport { socket }))
    }
}

fn set_read_timeout(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> io::Result<()> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::Rustls(stream) => stream.get_mut().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

struct TungsteniteTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl FrameTransport for TungsteniteTransport {
    fn poll_frame(&mut self) -> RealtimeResult<Option<Frame>> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Some(Frame::Text(text))),
            Ok(Message::Close(_)) => Ok(Some(Frame::Close)),
            Ok(Message::Binary(bytes)) => {
                debug!(len = bytes.len(), "ignoring binary frame");
                Ok(None)
            }
            // ping/pong are answered by tungstenite itself
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(Some(Frame::Close))
            }
            Err(e) => Err(RealtimeError::Connection(e.to_string())),
        }
    }

    fn send_text(&mut self, text: &str) -> RealtimeResult<()> {
        self.socket
            .send(Message::Text(text.to_string()))
            .map_err(|e| RealtimeError::Send(e.to_string()))
    }

    fn close(&mut self) -> RealtimeResult<()> {
        match self.socket.close(None) {
            Ok(()) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(())
            }
            Err(e) => return Err(RealtimeError::Connection(e.to_string())),
        }
        match self.socket.flush() {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(RealtimeError::Connection(e.to_string())),
        }
    }
}
