//! Error types for the presence layer.

use ludo_protocol::SessionId;

/// Errors a presence backend can report.
///
/// A session that is simply gone is NOT an error; see
/// [`Attachment::Absent`](crate::Attachment::Absent).
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// A session with this id is already registered.
    #[error("session {0} is already connected")]
    AlreadyConnected(SessionId),

    /// The backend itself could not be reached (remote pub/sub, etc.).
    #[error("presence backend unavailable: {0}")]
    Unavailable(String),
}
