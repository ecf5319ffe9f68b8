//! The persisted room document and its lifecycle state machine.
//!
//! Field names serialize in camelCase so the stored document matches what
//! existing clients already read (`ownerSessionId`, `gameState`,
//! `pieceId`, …).

use std::fmt;

use ludo_protocol::{Color, RoomToken, SessionId};
use serde::{Deserialize, Serialize};

/// Hard cap on players per room: one per color.
pub const MAX_PLAYERS: usize = Color::ALL.len();

/// Every player owns exactly this many pieces.
pub const PIECES_PER_PLAYER: usize = 4;

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// One game token on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    /// `"<color>-<ordinal>"`, e.g. `red-3`. Stable for the room's lifetime.
    pub piece_id: String,
    /// Board offset; `0` means still in base.
    pub position: u32,
    pub is_safe: bool,
    pub is_home: bool,
}

impl Piece {
    /// A piece sitting in base: position 0, safe, not home.
    pub fn spawn(color: Color, ordinal: usize) -> Self {
        Self {
            piece_id: format!("{color}-{ordinal}"),
            position: 0,
            is_safe: true,
            is_home: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Transport session the player joined with.
    pub session_id: SessionId,
    /// Unique within the room.
    pub color: Color,
    #[serde(default = "default_name")]
    pub name: String,
    /// Created together with the player; the array length makes
    /// "exactly four" a type-level fact.
    pub pieces: [Piece; PIECES_PER_PLAYER],
}

fn default_name() -> String {
    "Anonymous".to_string()
}

impl Player {
    /// A new player with four pieces in base.
    pub fn new(session_id: SessionId, color: Color) -> Self {
        Self {
            session_id,
            color,
            name: default_name(),
            pieces: std::array::from_fn(|i| Piece::spawn(color, i + 1)),
        }
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a room.
///
/// ```text
/// waiting ──→ ongoing ──→ finished
///               ↑  │          ↑
///               │  ▼          │
///              paused ────────┘
/// ```
///
/// Only `waiting` admits new players. Nothing in this crate fires the
/// later transitions on its own; the rules engine drives them through
/// [`RoomCoordinator::transition`](crate::RoomCoordinator::transition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Waiting,
    Ongoing,
    Paused,
    Finished,
}

impl GameStatus {
    /// Returns `true` if the room is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` while a game is underway (running or paused).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ongoing | Self::Paused)
    }

    /// Returns `true` if moving from `self` to `target` is a legal edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Ongoing)
                | (Self::Ongoing, Self::Paused)
                | (Self::Paused, Self::Ongoing)
                | (Self::Ongoing, Self::Finished)
                | (Self::Paused, Self::Finished)
        )
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Ongoing => "ongoing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        })
    }
}

// ---------------------------------------------------------------------------
// GameState / ChatEntry
// ---------------------------------------------------------------------------

/// Lifecycle status plus the turn/board fields owned by the rules engine.
///
/// The coordinator initializes these and never reads them back; `board`
/// is kept as raw JSON so the rules engine can change its shape freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub status: GameStatus,
    pub current_turn: Option<Color>,
    pub dice_value: Option<u8>,
    pub board: serde_json::Value,
    pub winner: Option<Color>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            status: GameStatus::Waiting,
            current_turn: None,
            dice_value: None,
            board: serde_json::Value::Array(Vec::new()),
            winner: None,
        }
    }
}

/// One chat line. Append-only; never written by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub sender_color: Color,
    pub message: String,
    /// Whisper target, if any.
    pub private_to: Option<Color>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A game session: the document the store persists under `token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub token: RoomToken,
    /// The creator's session at creation time. Not re-validated later;
    /// the owner may come back under a different session.
    pub owner_session_id: SessionId,
    /// Join order. Never empty, never more than [`MAX_PLAYERS`], never
    /// two entries with the same color.
    pub players: Vec<Player>,
    pub game_state: GameState,
    #[serde(default)]
    pub chat_history: Vec<ChatEntry>,
}

impl Room {
    /// A fresh `waiting` room with the owner seated as `owner_color`.
    pub fn new(token: RoomToken, owner: SessionId, owner_color: Color) -> Self {
        Self {
            token,
            owner_session_id: owner.clone(),
            players: vec![Player::new(owner, owner_color)],
            game_state: GameState::default(),
            chat_history: Vec::new(),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.game_state.status
    }

    /// The player who joined with `session_id`, if any.
    pub fn player(&self, session_id: &SessionId) -> Option<&Player> {
        self.players.iter().find(|p| &p.session_id == session_id)
    }

    /// Colors already taken, in join order.
    pub fn colors_in_use(&self) -> Vec<Color> {
        self.players.iter().map(|p| p.color).collect()
    }

    /// `true` when every color is taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }
}
