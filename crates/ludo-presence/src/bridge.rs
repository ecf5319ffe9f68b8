//! The `PresenceBridge` trait: the seam between room logic and live
//! connections.
//!
//! The coordinator only ever ATTACHES sessions and SENDS events. Removing
//! a session from a channel belongs to whoever owns the connection (the
//! server's disconnect path), so it is not part of this trait.
//!
//! Any backend satisfies the contract: the in-process
//! [`SessionRegistry`](crate::SessionRegistry), or an external pub/sub
//! shared by several coordinator processes.

use std::future::Future;
use std::sync::Arc;

use ludo_protocol::{RoomEvent, RoomToken, SessionId};

use crate::PresenceError;

/// Result of an [`attach`](PresenceBridge::attach) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The session now receives the room's broadcasts.
    Attached,
    /// The session was already on the channel; nothing changed.
    AlreadyAttached,
    /// No live session with that id. Nothing to attach.
    Absent,
}

/// Binds live sessions to room channels and delivers events to them.
///
/// Delivery is at-most-once and best-effort: the returned count is how
/// many live sessions the event was handed to, and `0` is a valid
/// answer. Methods return `Send` futures so coordinator calls can run
/// inside spawned tasks.
pub trait PresenceBridge: Send + Sync + 'static {
    /// Attaches `session_id` to the channel named `token`. Idempotent.
    fn attach(
        &self,
        session_id: &SessionId,
        token: &RoomToken,
    ) -> impl Future<Output = Result<Attachment, PresenceError>> + Send;

    /// `true` if the session is connected and can receive events.
    fn is_reachable(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = bool> + Send;

    /// Delivers `event` to one session, whether or not it is attached to
    /// any room.
    fn send_to_session(
        &self,
        session_id: &SessionId,
        event: RoomEvent,
    ) -> impl Future<Output = Result<usize, PresenceError>> + Send;

    /// Delivers `event` to every session attached to `token`.
    fn send_to_room(
        &self,
        token: &RoomToken,
        event: RoomEvent,
    ) -> impl Future<Output = Result<usize, PresenceError>> + Send;
}

impl<P: PresenceBridge> PresenceBridge for Arc<P> {
    fn attach(
        &self,
        session_id: &SessionId,
        token: &RoomToken,
    ) -> impl Future<Output = Result<Attachment, PresenceError>> + Send {
        (**self).attach(session_id, token)
    }

    fn is_reachable(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = bool> + Send {
        (**self).is_reachable(session_id)
    }

    fn send_to_session(
        &self,
        session_id: &SessionId,
        event: RoomEvent,
    ) -> impl Future<Output = Result<usize, PresenceError>> + Send {
        (**self).send_to_session(session_id, event)
    }

    fn send_to_room(
        &self,
        token: &RoomToken,
        event: RoomEvent,
    ) -> impl Future<Output = Result<usize, PresenceError>> + Send {
        (**self).send_to_room(token, event)
    }
}
