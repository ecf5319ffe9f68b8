//! The room session coordinator: the only writer of room documents.
//!
//! Every operation follows the same shape: read from the store, decide,
//! write with compare-and-swap, then tell presence and the broadcaster.
//! The write is the outcome. Attach and notify happen after it and can
//! only be logged, never undone.

use ludo_presence::{Attachment, PresenceBridge};
use ludo_protocol::{Color, RoomEvent, RoomToken, SessionId};
use rand::Rng;

use crate::{
    Broadcaster, CoordinatorConfig, GameStatus, Player, Room, RoomError, RoomStore,
    StoreError, allocate_color,
};

/// What a caller learns from a successful create or join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomJoin {
    pub token: RoomToken,
    pub color: Color,
    /// `true` when the session was already seated and nothing changed.
    /// Always `false` for a create.
    pub already_joined: bool,
}

/// Creates rooms and admits players.
///
/// Generic over the storage engine and the presence backend so the same
/// logic runs against [`MemoryRoomStore`](crate::MemoryRoomStore) in tests
/// and against a shared store when several coordinators serve one pool of
/// rooms.
pub struct RoomCoordinator<S, P> {
    store: S,
    broadcaster: Broadcaster<P>,
    config: CoordinatorConfig,
}

impl<S: RoomStore, P: PresenceBridge> RoomCoordinator<S, P> {
    /// A coordinator with the default retry budget.
    pub fn new(store: S, presence: P) -> Self {
        Self::with_config(store, presence, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, presence: P, config: CoordinatorConfig) -> Self {
        Self {
            store,
            broadcaster: Broadcaster::new(presence),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn presence(&self) -> &P {
        self.broadcaster.presence()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Opens a new `waiting` room owned by `owner`, who is seated as red.
    ///
    /// The owner is attached to the room channel and sent `roomCreated`
    /// directly. The returned value is authoritative whether or not that
    /// event arrives.
    ///
    /// # Errors
    /// - [`RoomError::InvalidRequest`] if `owner` is empty
    /// - [`RoomError::Transient`] if no unique token could be stored
    ///   within the attempt budget, or the store is unavailable
    pub async fn create_room(&self, owner: &SessionId) -> Result<RoomJoin, RoomError> {
        if owner.is_empty() {
            return Err(RoomError::InvalidRequest("owner session id is required".into()));
        }

        let color = Color::ALL[0];
        let token = self.store_new_room(owner, color).await?;
        tracing::info!(%token, owner = %owner, color = %color, "room created");

        self.attach(owner, &token).await;
        self.broadcaster
            .notify_one(
                owner,
                RoomEvent::RoomCreated {
                    token: token.clone(),
                    color,
                },
            )
            .await;

        Ok(RoomJoin {
            token,
            color,
            already_joined: false,
        })
    }

    /// Seats `joiner` in the room `token` under the next free color.
    ///
    /// Joining twice with the same session returns the first color with
    /// `already_joined` set, and neither writes nor broadcasts. A fresh
    /// join is broadcast as `playerJoined` to every attached session,
    /// the joiner included.
    ///
    /// # Errors
    /// - [`RoomError::InvalidRequest`] if either argument is empty
    /// - [`RoomError::NotFound`] if no room has this token
    /// - [`RoomError::NotJoinable`] if the room is past `waiting`
    /// - [`RoomError::RoomFull`] if all four colors are taken
    /// - [`RoomError::Transient`] if concurrent writers kept winning
    ///   the race for the attempt budget
    pub async fn join_room(
        &self,
        token: &RoomToken,
        joiner: &SessionId,
    ) -> Result<RoomJoin, RoomError> {
        if token.is_empty() {
            return Err(RoomError::InvalidRequest("room token is required".into()));
        }
        if joiner.is_empty() {
            return Err(RoomError::InvalidRequest("joiner session id is required".into()));
        }

        let attempts = self.config.attempts();
        let mut conflicts = 0;

        let color = loop {
            let stored = self.store.get_room(token).await?;
            let room = &stored.room;

            if !room.status().is_joinable() {
                return Err(RoomError::NotJoinable {
                    token: token.clone(),
                    status: room.status(),
                });
            }
            if let Some(player) = room.player(joiner) {
                tracing::debug!(%token, joiner = %joiner, color = %player.color, "already joined");
                return Ok(RoomJoin {
                    token: token.clone(),
                    color: player.color,
                    already_joined: true,
                });
            }
            let color = allocate_color(room)?;

            // Re-classified against a fresh read above; only a room that
            // still has space ends up here after the budget is spent.
            if conflicts >= attempts {
                tracing::warn!(%token, joiner = %joiner, conflicts, "join gave up after repeated conflicts");
                return Err(RoomError::Transient(format!(
                    "room {token} stayed contended after {conflicts} attempts"
                )));
            }

            let player = Player::new(joiner.clone(), color);
            match self.store.add_player(token, player, room.players.len()).await {
                Ok(_) => break color,
                Err(StoreError::Conflict { reason, .. }) => {
                    conflicts += 1;
                    tracing::debug!(%token, joiner = %joiner, attempt = conflicts, %reason, "join conflicted, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(%token, joiner = %joiner, color = %color, "player joined");

        self.attach(joiner, token).await;
        self.broadcaster
            .notify_room(
                token,
                RoomEvent::PlayerJoined {
                    token: token.clone(),
                    joiner_session_id: joiner.clone(),
                    color,
                },
            )
            .await;

        Ok(RoomJoin {
            token: token.clone(),
            color,
            already_joined: false,
        })
    }

    /// Current state of a room.
    ///
    /// # Errors
    /// [`RoomError::InvalidRequest`] on an empty token,
    /// [`RoomError::NotFound`] if no room has it.
    pub async fn get_room(&self, token: &RoomToken) -> Result<Room, RoomError> {
        if token.is_empty() {
            return Err(RoomError::InvalidRequest("room token is required".into()));
        }
        Ok(self.store.get_room(token).await?.room)
    }

    /// Moves a room along its lifecycle.
    ///
    /// Nothing in this crate calls it; the rules engine does when a game
    /// starts, pauses, resumes or ends.
    ///
    /// # Errors
    /// - [`RoomError::InvalidRequest`] on an empty token
    /// - [`RoomError::NotFound`] if no room has this token
    /// - [`RoomError::InvalidTransition`] if `next` is not reachable from
    ///   the current status
    /// - [`RoomError::Transient`] if the status kept changing underneath
    pub async fn transition(
        &self,
        token: &RoomToken,
        next: GameStatus,
    ) -> Result<Room, RoomError> {
        if token.is_empty() {
            return Err(RoomError::InvalidRequest("room token is required".into()));
        }

        let attempts = self.config.attempts();
        let mut conflicts = 0;

        loop {
            let current = self.store.get_room(token).await?.room.status();
            if !current.can_transition_to(next) {
                return Err(RoomError::InvalidTransition {
                    token: token.clone(),
                    from: current,
                    to: next,
                });
            }
            if conflicts >= attempts {
                return Err(RoomError::Transient(format!(
                    "room {token} status kept changing"
                )));
            }

            match self.store.set_status(token, current, next).await {
                Ok(stored) => {
                    tracing::info!(%token, from = %current, to = %next, "room status changed");
                    return Ok(stored.room);
                }
                Err(StoreError::Conflict { reason, .. }) => {
                    conflicts += 1;
                    tracing::debug!(%token, attempt = conflicts, %reason, "status change conflicted");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Inserts a fresh room, drawing a new token on collision.
    async fn store_new_room(
        &self,
        owner: &SessionId,
        color: Color,
    ) -> Result<RoomToken, RoomError> {
        let attempts = self.config.attempts();
        for attempt in 1..=attempts {
            let room = Room::new(generate_token(), owner.clone(), color);
            match self.store.create_room(room).await {
                Ok(token) => return Ok(token),
                Err(StoreError::DuplicateToken(token)) => {
                    tracing::debug!(%token, attempt, "room token collision, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RoomError::Transient(format!(
            "no unique room token after {attempts} attempts"
        )))
    }

    /// Attaches after a committed write. Failure is logged and dropped.
    async fn attach(&self, session_id: &SessionId, token: &RoomToken) {
        match self.presence().attach(session_id, token).await {
            Ok(Attachment::Attached | Attachment::AlreadyAttached) => {}
            Ok(Attachment::Absent) => {
                tracing::warn!(%session_id, %token, "session not connected, room events will not reach it");
            }
            Err(e) => {
                tracing::warn!(%session_id, %token, error = %e, "attach failed");
            }
        }
    }
}

/// 16 random bytes as 32 lowercase hex characters (128 bits).
fn generate_token() -> RoomToken {
    let bytes: [u8; 16] = rand::rng().random();
    RoomToken::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}
