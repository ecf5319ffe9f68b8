//! Transport abstraction layer for Ludo rooms.
//!
//! A [`Transport`] accepts [`Connection`]s. A connection is split once,
//! right after accept, into a [`FrameSink`] (outbound) and a
//! [`FrameStream`] (inbound) so that a writer task can push room events
//! while the reader is parked waiting for the next client frame.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketSink, WebSocketStream, WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for an accepted connection. Only used in logs; the
/// room layer identifies peers by session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A freshly accepted, not yet split connection.
pub trait Connection: Send + 'static {
    /// Outbound half.
    type Sink: FrameSink;
    /// Inbound half.
    type Stream: FrameStream;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Splits the connection into independently owned halves.
    fn split(self) -> (Self::Sink, Self::Stream);
}

/// The sending half of a connection.
pub trait FrameSink: Send + 'static {
    /// Sends one frame to the remote peer.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Sends a close frame. Further sends fail.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// The receiving half of a connection.
pub trait FrameStream: Send + 'static {
    /// Receives the next data frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }
}
