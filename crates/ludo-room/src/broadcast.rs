//! Best-effort event delivery on top of a [`PresenceBridge`].
//!
//! By the time anything is broadcast the room write has already
//! committed, so a delivery failure must never turn into an operation
//! failure. Both methods log and return how many sessions got the event.

use ludo_presence::PresenceBridge;
use ludo_protocol::{RoomEvent, RoomToken, SessionId};

/// Pushes [`RoomEvent`]s to one session or to a whole room channel.
#[derive(Debug, Clone)]
pub struct Broadcaster<P> {
    presence: P,
}

impl<P: PresenceBridge> Broadcaster<P> {
    pub fn new(presence: P) -> Self {
        Self { presence }
    }

    /// The underlying bridge.
    pub fn presence(&self) -> &P {
        &self.presence
    }

    /// Sends `event` to `session_id` only.
    pub async fn notify_one(&self, session_id: &SessionId, event: RoomEvent) -> usize {
        let name = event.name();
        match self.presence.send_to_session(session_id, event).await {
            Ok(delivered) => {
                tracing::debug!(%session_id, event = name, delivered, "event sent to session");
                delivered
            }
            Err(e) => {
                tracing::warn!(%session_id, event = name, error = %e, "event delivery failed");
                0
            }
        }
    }

    /// Sends `event` to every session attached to `token`, the
    /// triggering session included.
    pub async fn notify_room(&self, token: &RoomToken, event: RoomEvent) -> usize {
        let name = event.name();
        match self.presence.send_to_room(token, event).await {
            Ok(delivered) => {
                tracing::debug!(%token, event = name, delivered, "event broadcast to room");
                delivered
            }
            Err(e) => {
                tracing::warn!(%token, event = name, error = %e, "room broadcast failed");
                0
            }
        }
    }
}
