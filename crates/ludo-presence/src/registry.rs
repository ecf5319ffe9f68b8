//! The session registry: every live socket and the room channels it is
//! attached to.
//!
//! # Concurrency note
//!
//! One `tokio::sync::RwLock` guards both maps so that a disconnect and an
//! attach for the same session can never interleave into a channel
//! entry for a session that no longer exists. Deliveries only need the
//! read lock, so broadcasts to different rooms run side by side.

use std::collections::{BTreeSet, HashMap};

use ludo_protocol::{RoomEvent, RoomToken, SessionId};
use rand::Rng;
use tokio::sync::RwLock;

use crate::session::LiveSession;
use crate::{Attachment, EventSender, PresenceBridge, PresenceError, SessionInfo};

/// In-process [`PresenceBridge`] backed by one unbounded event channel
/// per connected session.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ attach(token)* ──→ disconnect()
///     │               │                  │
///     ▼               ▼                  ▼
/// [live, no rooms] [live, on channels] [gone; removed from every channel]
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Live sessions, keyed by session id.
    sessions: HashMap<SessionId, LiveSession>,

    /// Room channel membership. Kept in sync with `LiveSession::rooms`;
    /// empty channels are dropped.
    channels: HashMap<RoomToken, BTreeSet<SessionId>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new live session and returns its freshly generated id.
    pub async fn connect(&self, sender: EventSender) -> SessionId {
        let mut inner = self.inner.write().await;
        let session_id = loop {
            let candidate = SessionId::new(generate_id());
            if !inner.sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        inner
            .sessions
            .insert(session_id.clone(), LiveSession::new(sender));
        tracing::debug!(%session_id, "session connected");
        session_id
    }

    /// Registers a live session under a caller-chosen id.
    ///
    /// # Errors
    /// Returns [`PresenceError::AlreadyConnected`] if the id is taken.
    pub async fn connect_with_id(
        &self,
        session_id: SessionId,
        sender: EventSender,
    ) -> Result<(), PresenceError> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session_id) {
            return Err(PresenceError::AlreadyConnected(session_id));
        }
        tracing::debug!(%session_id, "session connected");
        inner.sessions.insert(session_id, LiveSession::new(sender));
        Ok(())
    }

    /// Removes a session and detaches it from every room channel.
    ///
    /// Returns `false` if the session was not registered.
    pub async fn disconnect(&self, session_id: &SessionId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(session) = inner.sessions.remove(session_id) else {
            return false;
        };

        for token in &session.rooms {
            if let Some(members) = inner.channels.get_mut(token) {
                members.remove(session_id);
                if members.is_empty() {
                    inner.channels.remove(token);
                }
            }
        }

        tracing::debug!(
            %session_id,
            rooms = session.rooms.len(),
            "session disconnected"
        );
        true
    }

    /// Sessions currently attached to `token`, sorted.
    pub async fn members(&self, token: &RoomToken) -> Vec<SessionId> {
        self.inner
            .read()
            .await
            .channels
            .get(token)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of one session.
    pub async fn session(&self, session_id: &SessionId) -> Option<SessionInfo> {
        let inner = self.inner.read().await;
        inner.sessions.get(session_id).map(|s| SessionInfo {
            session_id: session_id.clone(),
            rooms: s.rooms.iter().cloned().collect(),
            connected_at: s.connected_at,
        })
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// `true` if no session is connected.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}

impl PresenceBridge for SessionRegistry {
    async fn attach(
        &self,
        session_id: &SessionId,
        token: &RoomToken,
    ) -> Result<Attachment, PresenceError> {
        let mut inner = self.inner.write().await;

        let Some(session) = inner.sessions.get_mut(session_id) else {
            tracing::debug!(%session_id, %token, "attach: session not connected");
            return Ok(Attachment::Absent);
        };
        if !session.rooms.insert(token.clone()) {
            return Ok(Attachment::AlreadyAttached);
        }

        inner
            .channels
            .entry(token.clone())
            .or_default()
            .insert(session_id.clone());
        tracing::debug!(%session_id, %token, "session attached to room");
        Ok(Attachment::Attached)
    }

    async fn is_reachable(&self, session_id: &SessionId) -> bool {
        self.inner
            .read()
            .await
            .sessions
            .get(session_id)
            .is_some_and(LiveSession::is_open)
    }

    async fn send_to_session(
        &self,
        session_id: &SessionId,
        event: RoomEvent,
    ) -> Result<usize, PresenceError> {
        let inner = self.inner.read().await;
        let Some(session) = inner.sessions.get(session_id) else {
            tracing::warn!(
                %session_id,
                event = event.name(),
                "dropping event: session not connected"
            );
            return Ok(0);
        };
        Ok(deliver(session_id, session, event))
    }

    async fn send_to_room(
        &self,
        token: &RoomToken,
        event: RoomEvent,
    ) -> Result<usize, PresenceError> {
        let inner = self.inner.read().await;
        let Some(members) = inner.channels.get(token) else {
            tracing::debug!(%token, event = event.name(), "room channel is empty");
            return Ok(0);
        };

        let mut delivered = 0;
        for session_id in members {
            if let Some(session) = inner.sessions.get(session_id) {
                delivered += deliver(session_id, session, event.clone());
            }
        }
        Ok(delivered)
    }
}

/// Hands one event to one session's writer. Returns 1 on success, 0 if
/// the writer is already gone.
fn deliver(session_id: &SessionId, session: &LiveSession, event: RoomEvent) -> usize {
    let name = event.name();
    match session.sender.send(event) {
        Ok(()) => 1,
        Err(_) => {
            tracing::warn!(%session_id, event = name, "dropping event: connection closed");
            0
        }
    }
}

/// 16 random bytes as 32 lowercase hex characters (128 bits).
fn generate_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use ludo_protocol::Color;
    use tokio::sync::mpsc;

    use super::*;
    use crate::EventReceiver;

    fn sid(s: &str) -> SessionId {
        SessionId::new(s)
    }

    fn token(s: &str) -> RoomToken {
        RoomToken::new(s)
    }

    fn joined(room: &str, who: &str, color: Color) -> RoomEvent {
        RoomEvent::PlayerJoined {
            token: token(room),
            joiner_session_id: sid(who),
            color,
        }
    }

    async fn registry_with(ids: &[&str]) -> (SessionRegistry, Vec<EventReceiver>) {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        for id in ids {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.connect_with_id(sid(id), tx).await.unwrap();
            receivers.push(rx);
        }
        (registry, receivers)
    }

    // =====================================================================
    // connect / disconnect
    // =====================================================================

    #[tokio::test]
    async fn test_connect_generates_unique_hex_ids() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let a = registry.connect(tx.clone()).await;
        let b = registry.connect(tx).await;

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_connect_with_id_rejects_duplicate() {
        let (registry, _rx) = registry_with(&["s1"]).await;
        let (tx, _rx2) = mpsc::unbounded_channel();

        let result = registry.connect_with_id(sid("s1"), tx).await;
        assert!(matches!(result, Err(PresenceError::AlreadyConnected(_))));
    }

    #[tokio::test]
    async fn test_disconnect_removes_session_from_every_channel() {
        let (registry, _rx) = registry_with(&["s1", "s2"]).await;
        registry.attach(&sid("s1"), &token("a")).await.unwrap();
        registry.attach(&sid("s1"), &token("b")).await.unwrap();
        registry.attach(&sid("s2"), &token("a")).await.unwrap();

        assert!(registry.disconnect(&sid("s1")).await);

        assert_eq!(registry.members(&token("a")).await, vec![sid("s2")]);
        assert!(registry.members(&token("b")).await.is_empty());
        assert!(!registry.is_reachable(&sid("s1")).await);
        assert!(!registry.disconnect(&sid("s1")).await, "second call is a no-op");
    }

    // =====================================================================
    // attach
    // =====================================================================

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let (registry, _rx) = registry_with(&["s1"]).await;

        let first = registry.attach(&sid("s1"), &token("t")).await.unwrap();
        let second = registry.attach(&sid("s1"), &token("t")).await.unwrap();

        assert_eq!(first, Attachment::Attached);
        assert_eq!(second, Attachment::AlreadyAttached);
        assert_eq!(registry.members(&token("t")).await, vec![sid("s1")]);

        let info = registry.session(&sid("s1")).await.unwrap();
        assert_eq!(info.rooms, vec![token("t")]);
    }

    #[tokio::test]
    async fn test_attach_absent_session_is_not_an_error() {
        let registry = SessionRegistry::new();

        let result = registry.attach(&sid("ghost"), &token("t")).await;

        assert_eq!(result.unwrap(), Attachment::Absent);
        assert!(registry.members(&token("t")).await.is_empty());
    }

    // =====================================================================
    // delivery
    // =====================================================================

    #[tokio::test]
    async fn test_send_to_room_reaches_only_attached_sessions() {
        let (registry, mut rx) = registry_with(&["s1", "s2", "s3"]).await;
        registry.attach(&sid("s1"), &token("t")).await.unwrap();
        registry.attach(&sid("s2"), &token("t")).await.unwrap();
        registry.attach(&sid("s3"), &token("other")).await.unwrap();

        let event = joined("t", "s2", Color::Blue);
        let delivered = registry.send_to_room(&token("t"), event.clone()).await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(rx[0].try_recv().unwrap(), event);
        assert_eq!(rx[1].try_recv().unwrap(), event);
        assert!(rx[2].try_recv().is_err(), "s3 is on another channel");
    }

    #[tokio::test]
    async fn test_send_to_session_ignores_channels() {
        let (registry, mut rx) = registry_with(&["s1"]).await;
        let event = RoomEvent::RoomCreated {
            token: token("t"),
            color: Color::Red,
        };

        let delivered = registry.send_to_session(&sid("s1"), event.clone()).await.unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(rx[0].try_recv().unwrap(), event);
    }

    #[tokio::test]
    async fn test_send_to_missing_session_delivers_nothing() {
        let registry = SessionRegistry::new();
        let event = joined("t", "s1", Color::Red);

        assert_eq!(registry.send_to_session(&sid("nope"), event.clone()).await.unwrap(), 0);
        assert_eq!(registry.send_to_room(&token("t"), event).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_receiver_counts_as_unreachable() {
        let (registry, mut rx) = registry_with(&["s1", "s2"]).await;
        registry.attach(&sid("s1"), &token("t")).await.unwrap();
        registry.attach(&sid("s2"), &token("t")).await.unwrap();
        drop(rx.remove(0)); // s1's connection task is gone

        assert!(!registry.is_reachable(&sid("s1")).await);
        assert!(registry.is_reachable(&sid("s2")).await);

        let delivered = registry
            .send_to_room(&token("t"), joined("t", "s2", Color::Blue))
            .await
            .unwrap();
        assert_eq!(delivered, 1);
    }
}
