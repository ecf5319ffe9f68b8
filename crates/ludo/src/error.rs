//! Unified error type for the Ludo server.

use ludo_presence::PresenceError;
use ludo_protocol::ProtocolError;
use ludo_room::RoomError;
use ludo_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LudoError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The presence backend refused a session.
    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// A room operation failed.
    #[error(transparent)]
    Room(#[from] RoomError),
}
