//! Error types for the room layer.

use ludo_protocol::RoomToken;

use crate::GameStatus;

/// Errors surfaced by [`RoomCoordinator`](crate::RoomCoordinator)
/// operations.
///
/// Every variant maps to something a player can be told. The store's
/// compare-and-swap conflict is absent: the coordinator
/// retries it internally and only ever reports [`RoomError::Transient`]
/// once the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Malformed input (empty token or session id). Not worth retrying.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No room has this token.
    #[error("room {0} not found")]
    NotFound(RoomToken),

    /// The room exists but its lifecycle state doesn't admit players.
    #[error("room {token} is not accepting players (status: {status})")]
    NotJoinable { token: RoomToken, status: GameStatus },

    /// All four colors are taken.
    #[error("room {0} is full")]
    RoomFull(RoomToken),

    /// The requested lifecycle move isn't a legal edge.
    #[error("room {token} cannot move from {from} to {to}")]
    InvalidTransition {
        token: RoomToken,
        from: GameStatus,
        to: GameStatus,
    },

    /// Storage stayed contended or unavailable. The caller may retry the
    /// whole operation.
    #[error("temporary failure, try again: {0}")]
    Transient(String),
}

/// Errors a [`RoomStore`](crate::RoomStore) backend can return.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A room with this token already exists.
    #[error("duplicate room token {0}")]
    DuplicateToken(RoomToken),

    /// No room has this token.
    #[error("room {0} not found")]
    NotFound(RoomToken),

    /// The stored room no longer matches the caller's expectation.
    #[error("write conflict on room {token}: {reason}")]
    Conflict { token: RoomToken, reason: String },

    /// The storage engine failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for RoomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(token) => RoomError::NotFound(token),
            other => RoomError::Transient(other.to_string()),
        }
    }
}
