//! Room storage: the single source of truth for which rooms exist and who
//! is in them.
//!
//! Writes that depend on what the caller last read are conditional. The
//! allocator is not atomic with persistence, so
//! [`add_player`](RoomStore::add_player) only commits if the room still
//! has the player count the caller allocated against; anything else is a
//! [`StoreError::Conflict`] and the caller re-reads.

use std::collections::HashMap;
use std::future::Future;

use ludo_protocol::RoomToken;
use tokio::sync::RwLock;

use crate::{GameStatus, MAX_PLAYERS, Player, Room, StoreError};

/// A room together with its write version.
///
/// `version` starts at 1 and goes up by one with every committed write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRoom {
    pub room: Room,
    pub version: u64,
}

/// Durable CRUD over room documents.
///
/// The room token is unique across the store. Methods return `Send`
/// futures so coordinators can be driven from spawned tasks.
pub trait RoomStore: Send + Sync + 'static {
    /// Inserts a new room.
    ///
    /// # Errors
    /// [`StoreError::DuplicateToken`] if the token is already taken.
    fn create_room(
        &self,
        room: Room,
    ) -> impl Future<Output = Result<RoomToken, StoreError>> + Send;

    /// Loads a room by token.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if no room has this token.
    fn get_room(
        &self,
        token: &RoomToken,
    ) -> impl Future<Output = Result<StoredRoom, StoreError>> + Send;

    /// Appends `player` if the room still holds exactly
    /// `expected_player_count` players.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if no room has this token
    /// - [`StoreError::Conflict`] if the count moved, the room stopped
    ///   waiting, or the player's color or session is already seated
    fn add_player(
        &self,
        token: &RoomToken,
        player: Player,
        expected_player_count: usize,
    ) -> impl Future<Output = Result<StoredRoom, StoreError>> + Send;

    /// Moves the room from `expected` to `next` if it is still in
    /// `expected`. Edge legality is the caller's business.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if no room has this token
    /// - [`StoreError::Conflict`] if the status is no longer `expected`
    fn set_status(
        &self,
        token: &RoomToken,
        expected: GameStatus,
        next: GameStatus,
    ) -> impl Future<Output = Result<StoredRoom, StoreError>> + Send;
}

/// In-process [`RoomStore`]. The map key is the uniqueness constraint on
/// `token`; the write lock serializes commits per store.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomToken, StoredRoom>>,
}

impl MemoryRoomStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Every stored token, sorted.
    pub async fn tokens(&self) -> Vec<RoomToken> {
        let mut tokens: Vec<RoomToken> =
            self.rooms.read().await.keys().cloned().collect();
        tokens.sort();
        tokens
    }
}

impl RoomStore for MemoryRoomStore {
    async fn create_room(&self, room: Room) -> Result<RoomToken, StoreError> {
        let mut rooms = self.rooms.write().await;
        let token = room.token.clone();
        if rooms.contains_key(&token) {
            return Err(StoreError::DuplicateToken(token));
        }
        rooms.insert(token.clone(), StoredRoom { room, version: 1 });
        Ok(token)
    }

    async fn get_room(&self, token: &RoomToken) -> Result<StoredRoom, StoreError> {
        self.rooms
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(token.clone()))
    }

    async fn add_player(
        &self,
        token: &RoomToken,
        player: Player,
        expected_player_count: usize,
    ) -> Result<StoredRoom, StoreError> {
        let mut rooms = self.rooms.write().await;
        let stored = rooms
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound(token.clone()))?;

        let conflict = |reason: String| StoreError::Conflict {
            token: token.clone(),
            reason,
        };

        let room = &mut stored.room;
        if room.players.len() != expected_player_count {
            return Err(conflict(format!(
                "expected {expected_player_count} players, found {}",
                room.players.len()
            )));
        }
        if !room.status().is_joinable() {
            return Err(conflict(format!("room is {}", room.status())));
        }
        if room.players.len() >= MAX_PLAYERS {
            return Err(conflict("room is full".into()));
        }
        if room.players.iter().any(|p| p.color == player.color) {
            return Err(conflict(format!("color {} is taken", player.color)));
        }
        if room.player(&player.session_id).is_some() {
            return Err(conflict(format!(
                "session {} is already seated",
                player.session_id
            )));
        }

        room.players.push(player);
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn set_status(
        &self,
        token: &RoomToken,
        expected: GameStatus,
        next: GameStatus,
    ) -> Result<StoredRoom, StoreError> {
        let mut rooms = self.rooms.write().await;
        let stored = rooms
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound(token.clone()))?;

        let current = stored.room.status();
        if current != expected {
            return Err(StoreError::Conflict {
                token: token.clone(),
                reason: format!("expected status {expected}, found {current}"),
            });
        }

        stored.room.game_state.status = next;
        stored.version += 1;
        Ok(stored.clone())
    }
}
