//! Session types: what the registry knows about one live connection.

use std::collections::BTreeSet;
use std::time::Instant;

use ludo_protocol::{RoomEvent, RoomToken, SessionId};
use tokio::sync::mpsc;

/// Channel sender for pushing room events to one connection's writer.
pub type EventSender = mpsc::UnboundedSender<RoomEvent>;

/// Receiving end of an [`EventSender`], owned by the connection task.
pub type EventReceiver = mpsc::UnboundedReceiver<RoomEvent>;

/// A live session inside the registry.
#[derive(Debug)]
pub(crate) struct LiveSession {
    pub(crate) sender: EventSender,
    pub(crate) rooms: BTreeSet<RoomToken>,
    pub(crate) connected_at: Instant,
}

impl LiveSession {
    pub(crate) fn new(sender: EventSender) -> Self {
        Self {
            sender,
            rooms: BTreeSet::new(),
            connected_at: Instant::now(),
        }
    }

    /// `false` once the connection task has dropped its receiver.
    pub(crate) fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// A read-only snapshot of a session, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: SessionId,
    /// Room channels this session is attached to, sorted by token.
    pub rooms: Vec<RoomToken>,
    pub connected_at: Instant,
}
