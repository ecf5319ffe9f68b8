//! Core protocol types for the Ludo room wire format.
//!
//! Everything in this module is serialized onto the socket, so the serde
//! attributes ARE the wire contract. Changing a `rename` here changes what
//! browser clients see.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A transport session identifier.
///
/// Assigned by the server when a connection is accepted and stable for
/// the lifetime of that connection. A player who reconnects gets a new
/// one; the room document keeps whatever id they joined with.
///
/// `#[serde(transparent)]` keeps the JSON a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw session id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the empty id, which every operation rejects.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The opaque, globally unique identifier of a room.
///
/// Doubles as the storage key and as the name of the room's broadcast
/// channel, so a token that routes a lookup also routes an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomToken(String);

impl RoomToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the empty token, which every operation rejects.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoomToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Color: the player slot
// ---------------------------------------------------------------------------

/// A player slot inside a room. At most one player per color per room.
///
/// Variant order is the allocation order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Color {
    /// Every color, in the order slots are handed out.
    pub const ALL: [Color; 4] =
        [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RoomEvent: real-time notifications
// ---------------------------------------------------------------------------

/// A notification the coordinator pushes to room members.
///
/// Internally tagged with `event`, camelCase throughout, e.g.
/// `{ "event": "playerJoined", "token": "…", "joinerSessionId": "…", "color": "blue" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RoomEvent {
    /// Sent only to the creator of a room.
    RoomCreated { token: RoomToken, color: Color },

    /// Sent to every session attached to the room, the joiner included.
    PlayerJoined {
        token: RoomToken,
        #[serde(rename = "joinerSessionId")]
        joiner_session_id: SessionId,
        color: Color,
    },
}

impl RoomEvent {
    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "roomCreated",
            Self::PlayerJoined { .. } => "playerJoined",
        }
    }

    /// The room this event concerns.
    pub fn token(&self) -> &RoomToken {
        match self {
            Self::RoomCreated { token, .. }
            | Self::PlayerJoined { token, .. } => token,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and replies
// ---------------------------------------------------------------------------

/// Client → Server requests.
///
/// The session id of a request is the session of the connection it
/// arrives on; clients never name it themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Create a room owned by this session.
    CreateRoom,

    /// Join an existing room.
    JoinRoom { token: RoomToken },

    /// Keep-alive. `client_time` is echoed back for RTT measurement.
    Heartbeat { client_time: u64 },

    /// The client is leaving; the server closes the connection.
    Disconnect { reason: String },
}

/// Server → Client direct replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First frame on every connection: the session id the server
    /// assigned to it.
    Welcome { session_id: SessionId },

    /// Reply to `CreateRoom`.
    RoomCreated { token: RoomToken, color: Color },

    /// Reply to `JoinRoom`. `already_joined` is `true` when this session
    /// was already a member and nothing changed.
    RoomJoined {
        token: RoomToken,
        color: Color,
        already_joined: bool,
    },

    /// Reply to `Heartbeat`.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// A request failed. `code` follows HTTP conventions
    /// (400 bad request, 404 not found, 409 conflict, 503 retry later).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged:
/// `{ "type": "Event", "data": { "event": "roomCreated", … } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Request(ClientRequest),
    Reply(ServerMessage),
    Event(RoomEvent),
}

/// The top-level frame. Every message on the socket is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    #[serde(default)]
    pub timestamp: u64,

    /// On replies, the `seq` of the request being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,

    pub payload: Payload,
}

impl Envelope {
    /// An envelope with no timestamp and no `reply_to`.
    pub fn new(seq: u64, payload: Payload) -> Self {
        Self {
            seq,
            timestamp: 0,
            reply_to: None,
            payload,
        }
    }
}
